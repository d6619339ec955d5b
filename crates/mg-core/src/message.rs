//! Command and event bodies exchanged with the engine

use crate::types::PluginParams;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a command sent to, or an event emitted by, the engine.
///
/// The numeric code is what crosses the bridge; the name is what API
/// surfaces and logs show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    ResourceAdd,
    ResourceRemove,
    ResourceStart,
    ResourceEnd,
    OutputAdd,
    OutputRemove,
    OutputError,
    PluginAdd,
    PluginRemove,
    PluginUpdate,
    PlayStop,
    PlayEnd,
    EngineLog,
}

impl ActionKind {
    pub const ALL: [ActionKind; 13] = [
        ActionKind::ResourceAdd,
        ActionKind::ResourceRemove,
        ActionKind::ResourceStart,
        ActionKind::ResourceEnd,
        ActionKind::OutputAdd,
        ActionKind::OutputRemove,
        ActionKind::OutputError,
        ActionKind::PluginAdd,
        ActionKind::PluginRemove,
        ActionKind::PluginUpdate,
        ActionKind::PlayStop,
        ActionKind::PlayEnd,
        ActionKind::EngineLog,
    ];

    /// Wire code
    pub fn code(self) -> u32 {
        match self {
            ActionKind::ResourceAdd => 1,
            ActionKind::ResourceRemove => 2,
            ActionKind::ResourceStart => 3,
            ActionKind::ResourceEnd => 4,
            ActionKind::OutputAdd => 10,
            ActionKind::OutputRemove => 11,
            ActionKind::OutputError => 12,
            ActionKind::PluginAdd => 20,
            ActionKind::PluginRemove => 21,
            ActionKind::PluginUpdate => 22,
            ActionKind::PlayStop => 30,
            ActionKind::PlayEnd => 31,
            ActionKind::EngineLog => 40,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::ResourceAdd => "RESOURCE_ADD",
            ActionKind::ResourceRemove => "RESOURCE_REMOVE",
            ActionKind::ResourceStart => "RESOURCE_START",
            ActionKind::ResourceEnd => "RESOURCE_END",
            ActionKind::OutputAdd => "OUTPUT_ADD",
            ActionKind::OutputRemove => "OUTPUT_REMOVE",
            ActionKind::OutputError => "OUTPUT_ERROR",
            ActionKind::PluginAdd => "PLUGIN_ADD",
            ActionKind::PluginRemove => "PLUGIN_REMOVE",
            ActionKind::PluginUpdate => "PLUGIN_UPDATE",
            ActionKind::PlayStop => "PLAY_STOP",
            ActionKind::PlayEnd => "PLAY_END",
            ActionKind::EngineLog => "ENGINE_LOG",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === Commands (process -> engine) ===

/// Add a resource or output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddCommand {
    pub path: String,
    pub unique: String,
}

/// Add or update a plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginCommand {
    pub path: String,
    pub unique: String,
    pub params: PluginParams,
}

/// Remove any keyed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoveCommand {
    pub unique: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopCommand {}

// === Events (engine -> process) ===

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub path: String,
    pub unique: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputEvent {
    pub path: String,
    pub unique: String,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginEvent {
    pub path: String,
    pub unique: String,
    #[serde(default)]
    pub params: PluginParams,
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    #[serde(default)]
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub level: String,
    pub message: String,
}

/// Decoded event body, one variant per body schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventBody {
    Resource(ResourceEvent),
    Output(OutputEvent),
    Plugin(PluginEvent),
    Play(PlayEvent),
    Log(LogEvent),
}

impl EventBody {
    /// Identifying key carried by the body, if the schema has one
    pub fn unique(&self) -> Option<&str> {
        match self {
            EventBody::Resource(e) => Some(&e.unique),
            EventBody::Output(e) => Some(&e.unique),
            EventBody::Plugin(e) => Some(&e.unique),
            EventBody::Play(_) | EventBody::Log(_) => None,
        }
    }

    /// Engine-reported failure; empty strings count as success
    pub fn error(&self) -> Option<&str> {
        let error = match self {
            EventBody::Resource(e) => &e.error,
            EventBody::Output(e) => &e.error,
            EventBody::Plugin(e) => &e.error,
            EventBody::Play(e) => &e.error,
            EventBody::Log(_) => return None,
        };
        if error.is_empty() {
            None
        } else {
            Some(error.as_str())
        }
    }
}

/// A decoded engine message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub kind: ActionKind,
    pub body: EventBody,
}

impl Event {
    pub fn new(kind: ActionKind, body: EventBody) -> Self {
        Self { kind, body }
    }

    pub fn unique(&self) -> Option<&str> {
        self.body.unique()
    }

    pub fn error(&self) -> Option<&str> {
        self.body.error()
    }
}
