//! mg-jsonrpc: JSON-RPC surface for mediagate
//!
//! This crate provides:
//! - JSON-RPC 2.0 protocol types and error code mapping
//! - A method table over the module operations (`resource.add`, `play.stop`, ...)
//! - A line-delimited server over Unix sockets and TCP

pub mod methods;
pub mod protocol;
pub mod server;

pub use server::{JsonRpcServer, JsonRpcServerConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::protocol::{JsonRpcRequest, JsonRpcResponse};
    pub use super::server::{JsonRpcServer, JsonRpcServerConfig};
}
