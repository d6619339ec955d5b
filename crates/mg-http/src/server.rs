//! HTTP listener
//!
//! The router handed to the builder is wrapped in the middleware stack once,
//! at `build()`, and served as is.

use crate::middleware::{apply_middleware, MiddlewareConfig};
use crate::{Result, ServerError};
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Hostname advertised in logs
    pub public_host: String,
}

pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The layered router, for driving in-process
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn serve(self) -> Result<()> {
        let addr = self.config.addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve_on(listener).await
    }

    /// Serve on a listener the caller already bound
    pub async fn serve_on(self, listener: TcpListener) -> Result<()> {
        let local = listener.local_addr().map_err(ServerError::Serve)?;
        info!(
            addr = %local,
            url = %format!("http://{}:{}", self.config.public_host, local.port()),
            "HTTP server listening"
        );
        axum::serve(listener, self.router)
            .await
            .map_err(ServerError::Serve)
    }
}

pub struct HttpServerBuilder {
    bind: String,
    public_host: Option<String>,
    router: Router,
    middleware: MiddlewareConfig,
}

impl HttpServerBuilder {
    pub fn new() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            public_host: None,
            router: Router::new(),
            middleware: MiddlewareConfig::default(),
        }
    }

    /// `host:port`, or a bare port on all interfaces
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = addr.into();
        self
    }

    pub fn public_host(mut self, host: impl Into<String>) -> Self {
        self.public_host = Some(host.into());
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    pub fn middleware(mut self, config: MiddlewareConfig) -> Self {
        self.middleware = config;
        self
    }

    pub fn build(self) -> Result<HttpServer> {
        let addr = parse_bind(&self.bind)?;
        let public_host = self
            .public_host
            .unwrap_or_else(|| gethostname::gethostname().to_string_lossy().into_owned());

        Ok(HttpServer {
            config: ServerConfig { addr, public_host },
            router: apply_middleware(self.router, self.middleware),
        })
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    let candidate = match bind.parse::<u16>() {
        Ok(port) => format!("0.0.0.0:{}", port),
        Err(_) => bind.to_string(),
    };
    candidate
        .parse()
        .map_err(|_| ServerError::InvalidAddress(bind.to_string()))
}
