//! Layers wrapped around every HTTP route
//!
//! Module operations block for up to the keeper wait timeout, so the request
//! timeout here is always derived from it rather than picked independently.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::{self, Next},
    response::Response,
    Router,
};
use std::time::{Duration, Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Added on top of the keeper wait so a timed-out round trip still gets to
/// answer 504 itself before the HTTP layer cuts the request.
const TIMEOUT_GRACE: Duration = Duration::from_secs(5);

/// Which origins may call the API from a browser
#[derive(Debug, Clone, PartialEq)]
pub enum CorsPolicy {
    Disabled,
    AnyOrigin,
    Origins(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    pub cors: CorsPolicy,
    pub compression_enabled: bool,
    pub tracing_enabled: bool,
    pub request_logging: bool,
    pub security_headers: bool,
    pub request_timeout: Duration,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self::for_wait_timeout(Duration::from_millis(
            mg_core::config::DEFAULT_WAIT_TIMEOUT_MS as u64,
        ))
    }
}

impl MiddlewareConfig {
    /// Defaults with a request timeout that outlives `wait_timeout`
    pub fn for_wait_timeout(wait_timeout: Duration) -> Self {
        Self {
            cors: CorsPolicy::AnyOrigin,
            compression_enabled: true,
            tracing_enabled: true,
            request_logging: true,
            security_headers: true,
            request_timeout: wait_timeout + TIMEOUT_GRACE,
        }
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors = if enabled {
            CorsPolicy::AnyOrigin
        } else {
            CorsPolicy::Disabled
        };
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors = CorsPolicy::Origins(origins);
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    pub fn security_headers(mut self, enabled: bool) -> Self {
        self.security_headers = enabled;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = duration;
        self
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
        match &self.cors {
            CorsPolicy::Disabled => None,
            CorsPolicy::AnyOrigin => Some(layer.allow_origin(Any)),
            CorsPolicy::Origins(origins) => {
                let origins: Vec<HeaderValue> =
                    origins.iter().filter_map(|o| o.parse().ok()).collect();
                Some(layer.allow_origin(origins))
            }
        }
    }
}

pub struct MiddlewareStack {
    config: MiddlewareConfig,
}

impl MiddlewareStack {
    pub fn new(config: MiddlewareConfig) -> Self {
        Self { config }
    }

    /// Wrap `router`; layers added later run first on the way in
    pub fn apply(self, mut router: Router) -> Router {
        let config = self.config;

        if config.security_headers {
            router = router.layer(middleware::from_fn(security_headers));
        }
        if config.request_logging {
            router = router.layer(middleware::from_fn(log_request));
        }
        router = router.layer(TimeoutLayer::new(config.request_timeout));
        if config.compression_enabled {
            router = router.layer(CompressionLayer::new());
        }
        if config.tracing_enabled {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            );
        }
        if let Some(cors) = config.cors_layer() {
            router = router.layer(cors);
        }
        router
    }
}

async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("cache-control", HeaderValue::from_static("no-store"));
    response
}

/// One structured line per request, tagged with a request id that is echoed
/// back to the client. A caller-supplied id is kept.
async fn log_request(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| mg_core::unique::generate_with_prefix("req"));

    let mut response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(%method, %path, %request_id, status = status.as_u16(), elapsed_ms, "Request failed");
    } else if status.is_client_error() {
        tracing::warn!(%method, %path, %request_id, status = status.as_u16(), elapsed_ms, "Request rejected");
    } else {
        tracing::info!(%method, %path, %request_id, status = status.as_u16(), elapsed_ms, "Request served");
    }

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

pub fn apply_middleware(router: Router, config: MiddlewareConfig) -> Router {
    MiddlewareStack::new(config).apply(router)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_timeout_outlives_wait() {
        let config = MiddlewareConfig::for_wait_timeout(Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(7));
        assert!(MiddlewareConfig::default().request_timeout > Duration::from_secs(10));
    }

    #[test]
    fn test_cors_toggles() {
        let config = MiddlewareConfig::default().cors(false);
        assert_eq!(config.cors, CorsPolicy::Disabled);
        assert!(config.cors_layer().is_none());

        let config = config.cors_origins(vec!["https://studio.local".into()]);
        assert!(config.cors_layer().is_some());
    }
}
