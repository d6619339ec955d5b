//! mg-http: HTTP and websocket surface for mediagate
//!
//! ```text
//! /api/resource[/all|/:unique]  resource module
//! /api/output[/:unique]         output module
//! /api/plugin[/:unique]         plugin module
//! /api/play/stop                play module
//! /ws                           engine event push
//! /metrics                      keeper metrics, prometheus text
//! /health
//! ```
//!
//! Module errors map onto status codes in [`ApiError`].

pub mod api;
pub mod middleware;
pub mod router;
pub mod server;
pub mod ws;

pub use api::{create_app, create_router, ApiError, ApiRoutes, AppState, SystemRoutes};
pub use middleware::{CorsPolicy, MiddlewareConfig, MiddlewareStack};
pub use router::{Mount, Mountable, RouterBuilder};
pub use server::{HttpServer, HttpServerBuilder, ServerConfig};

pub use axum;

use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid bind address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
