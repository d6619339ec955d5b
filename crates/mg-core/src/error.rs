//! Error types for mediagate

use thiserror::Error;

/// Main error type for mediagate operations
#[derive(Error, Debug)]
pub enum Error {
    /// The bridge rejected the command before the engine saw it
    #[error("Send failure: {0}")]
    Send(String),

    /// The engine processed the command and reported an error body
    #[error("Engine failure: {0}")]
    Engine(String),

    /// No matching event arrived within the wait bound
    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot remove current item: {0}")]
    CannotRemoveCurrent(String),

    /// Another operation on the same unique has not returned yet
    #[error("Operation in flight: {0}")]
    InFlight(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn send(msg: impl Into<String>) -> Self {
        Error::Send(msg.into())
    }

    pub fn engine(msg: impl Into<String>) -> Self {
        Error::Engine(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Error::Timeout(msg.into())
    }

    pub fn duplicate_key(unique: impl Into<String>) -> Self {
        Error::DuplicateKey(unique.into())
    }

    pub fn not_found(unique: impl Into<String>) -> Self {
        Error::NotFound(unique.into())
    }

    pub fn cannot_remove_current(unique: impl Into<String>) -> Self {
        Error::CannotRemoveCurrent(unique.into())
    }

    pub fn in_flight(unique: impl Into<String>) -> Self {
        Error::InFlight(unique.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Stable machine-readable code used by the API surfaces
    pub fn code(&self) -> &'static str {
        match self {
            Error::Send(_) => "send_failure",
            Error::Engine(_) => "engine_failure",
            Error::Timeout(_) => "timeout",
            Error::DuplicateKey(_) => "duplicate_key",
            Error::NotFound(_) => "not_found",
            Error::CannotRemoveCurrent(_) => "cannot_remove_current",
            Error::InFlight(_) => "in_flight",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Codec(_) => "codec_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
            Error::Config(_) => "config_error",
            Error::Internal(_) => "internal_error",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_message_is_preserved() {
        let err = Error::engine("plugin file not found");
        assert!(matches!(&err, Error::Engine(msg) if msg == "plugin file not found"));
        assert_eq!(err.code(), "engine_failure");
    }

    #[test]
    fn test_display() {
        assert_eq!(Error::not_found("r1").to_string(), "Not found: r1");
        assert_eq!(
            Error::cannot_remove_current("r0").to_string(),
            "Cannot remove current item: r0"
        );
    }
}
