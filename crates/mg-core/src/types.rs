//! Domain items mirrored from the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Parameter mapping handed to an engine plugin
pub type PluginParams = HashMap<String, String>;

/// A media source queued for playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub unique: String,
    pub path: String,
    pub create_time: DateTime<Utc>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
}

impl Resource {
    pub fn new(path: impl Into<String>, unique: impl Into<String>) -> Self {
        Self {
            unique: unique.into(),
            path: path.into(),
            create_time: Utc::now(),
            start_time: None,
            end_time: None,
        }
    }

    /// Whether the engine has finished playing this resource
    pub fn is_played(&self) -> bool {
        self.end_time.is_some()
    }
}

/// A push target the engine streams to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub unique: String,
    pub path: String,
    pub create_time: DateTime<Utc>,
    /// Last asynchronous error the engine reported for this output
    #[serde(default)]
    pub error: Option<String>,
}

impl Output {
    pub fn new(path: impl Into<String>, unique: impl Into<String>) -> Self {
        Self {
            unique: unique.into(),
            path: path.into(),
            create_time: Utc::now(),
            error: None,
        }
    }
}

/// A filter/overlay plugin loaded into the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plugin {
    pub unique: String,
    pub path: String,
    #[serde(default)]
    pub params: PluginParams,
    pub create_time: DateTime<Utc>,
}

impl Plugin {
    pub fn new(path: impl Into<String>, unique: impl Into<String>, params: PluginParams) -> Self {
        Self {
            unique: unique.into(),
            path: path.into(),
            params,
            create_time: Utc::now(),
        }
    }
}
