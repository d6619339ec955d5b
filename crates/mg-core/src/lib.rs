//! Core types and utilities for mediagate
//!
//! # Modules
//!
//! - `config`: Environment and runtime configuration
//! - `error`: Error taxonomy and Result alias
//! - `message`: Action kinds, command bodies and decoded engine events
//! - `types`: Resources, outputs and plugins mirrored from the engine
//! - `unique`: Identifier generation

pub mod config;
pub mod error;
pub mod message;
pub mod types;
pub mod unique;

// Re-exports
pub use config::{EngineConfig, RuntimeConfig};
pub use error::{Error, Result};
pub use message::*;
pub use types::*;
