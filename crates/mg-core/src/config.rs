//! Environment Configuration Loader
//!
//! Loads environment variables from the canonical location: `/etc/mediagate/environment`,
//! then exposes typed accessors and the runtime settings the core needs.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before reading any config:
//!
//! ```rust
//! use mg_core::config::{load_environment, RuntimeConfig};
//!
//! load_environment();
//! let runtime = RuntimeConfig::from_env().unwrap();
//! assert!(runtime.wait_timeout.as_millis() > 0);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default path for the environment file
pub const DEFAULT_ENV_FILE: &str = "/etc/mediagate/environment";

/// Paths checked in order of priority
pub const ENV_FILE_PATHS: &[&str] = &["/etc/mediagate/environment", "/etc/mediagate.env", ".env"];

pub const DEFAULT_WAIT_TIMEOUT_MS: i64 = 10_000;
pub const DEFAULT_EVENT_BUFFER: i64 = 256;

/// Load environment variables from the canonical configuration file.
///
/// `MEDIAGATE_ENV_FILE` wins over the built-in paths. Existing variables
/// are never overridden. Returns the path that was loaded.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("MEDIAGATE_ENV_FILE") {
        if let Some(path) = load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

/// Load a single environment file. Returns the path on success.
pub fn load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();

                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!("Loaded: {}", key);
                    } else {
                        skipped_count += 1;
                        debug!("Skipped (already set): {}", key);
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );

            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse a single environment line into key-value pair.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    // KEY=VALUE, KEY="VALUE", KEY='VALUE'
    let mut parts = line.splitn(2, '=');
    let key = parts.next()?.trim();
    let value = parts.next()?.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get a configuration value with a default.
pub fn get_config(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an optional configuration value.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get a boolean configuration value.
pub fn get_config_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Get an integer configuration value.
pub fn get_config_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Encode parameters handed to the engine once at initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub video_bitrate: u32,
    pub audio_bitrate: u32,
    pub sample_rate: u32,
    pub channel_layout: String,
    /// Output protocol, e.g. "rtmp" or "srt"
    pub protocol: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            frame_rate: 25,
            video_bitrate: 2_000_000,
            audio_bitrate: 128_000,
            sample_rate: 44_100,
            channel_layout: "stereo".to_string(),
            protocol: "rtmp".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let read = |key: &str, default: u32| -> Result<u32> {
            u32::try_from(get_config_int(key, default as i64))
                .map_err(|_| Error::config(format!("{} out of range", key)))
        };

        let config = Self {
            width: read("MEDIAGATE_WIDTH", defaults.width)?,
            height: read("MEDIAGATE_HEIGHT", defaults.height)?,
            frame_rate: read("MEDIAGATE_FRAME_RATE", defaults.frame_rate)?,
            video_bitrate: read("MEDIAGATE_VIDEO_BITRATE", defaults.video_bitrate)?,
            audio_bitrate: read("MEDIAGATE_AUDIO_BITRATE", defaults.audio_bitrate)?,
            sample_rate: read("MEDIAGATE_SAMPLE_RATE", defaults.sample_rate)?,
            channel_layout: get_config("MEDIAGATE_CHANNEL_LAYOUT", &defaults.channel_layout),
            protocol: get_config("MEDIAGATE_PROTOCOL", &defaults.protocol),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let numeric = [
            ("width", self.width),
            ("height", self.height),
            ("frame_rate", self.frame_rate),
            ("video_bitrate", self.video_bitrate),
            ("audio_bitrate", self.audio_bitrate),
            ("sample_rate", self.sample_rate),
        ];
        if let Some((name, _)) = numeric.iter().find(|(_, v)| *v == 0) {
            return Err(Error::config(format!("{} must be non-zero", name)));
        }
        if self.channel_layout.is_empty() {
            return Err(Error::config("channel_layout must be set"));
        }
        if self.protocol.is_empty() {
            return Err(Error::config("protocol must be set"));
        }
        Ok(())
    }
}

/// Settings consumed by the correlation core
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Upper bound for every keeper wait
    pub wait_timeout: Duration,
    /// Capacity of the event push channel
    pub event_buffer: usize,
    pub engine: EngineConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_millis(DEFAULT_WAIT_TIMEOUT_MS as u64),
            event_buffer: DEFAULT_EVENT_BUFFER as usize,
            engine: EngineConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Result<Self> {
        let timeout_ms = get_config_int("MEDIAGATE_WAIT_TIMEOUT_MS", DEFAULT_WAIT_TIMEOUT_MS);
        if timeout_ms <= 0 {
            return Err(Error::config("MEDIAGATE_WAIT_TIMEOUT_MS must be positive"));
        }
        let event_buffer = get_config_int("MEDIAGATE_EVENT_BUFFER", DEFAULT_EVENT_BUFFER);
        if event_buffer <= 0 {
            return Err(Error::config("MEDIAGATE_EVENT_BUFFER must be positive"));
        }

        Ok(Self {
            wait_timeout: Duration::from_millis(timeout_ms as u64),
            event_buffer: event_buffer as usize,
            engine: EngineConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_env_line_simple() {
        let (k, v) = parse_env_line("FOO=bar").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar");
    }

    #[test]
    fn test_parse_env_line_quoted() {
        let (k, v) = parse_env_line("FOO=\"bar baz\"").unwrap();
        assert_eq!(k, "FOO");
        assert_eq!(v, "bar baz");

        let (_, v) = parse_env_line("FOO='bar'").unwrap();
        assert_eq!(v, "bar");
    }

    #[test]
    fn test_parse_env_line_empty() {
        assert!(parse_env_line("").is_none());
        assert!(parse_env_line("=value").is_none());
    }

    #[test]
    fn test_load_env_file_does_not_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "MG_TEST_LOADED=from_file").unwrap();
        writeln!(file, "MG_TEST_PRESET=from_file").unwrap();
        std::env::set_var("MG_TEST_PRESET", "from_env");

        let path = file.path().to_string_lossy().to_string();
        assert_eq!(load_env_file(&path), Some(path.clone()));
        assert_eq!(get_config("MG_TEST_LOADED", ""), "from_file");
        assert_eq!(get_config("MG_TEST_PRESET", ""), "from_env");
    }

    #[test]
    fn test_engine_config_validation() {
        assert!(EngineConfig::default().validate().is_ok());

        let broken = EngineConfig {
            frame_rate: 0,
            ..EngineConfig::default()
        };
        let err = broken.validate().unwrap_err();
        assert!(err.to_string().contains("frame_rate"));
    }

    #[test]
    fn test_runtime_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.wait_timeout, Duration::from_secs(10));
        assert_eq!(config.event_buffer, 256);
    }
}
