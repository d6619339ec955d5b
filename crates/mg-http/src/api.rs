//! REST routes over the module operations
//!
//! Mount with [`create_app`], or nest [`create_router`] under `/api` yourself.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use mg_core::{Error, PluginParams};
use mg_modules::ModuleManager;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::router::{Mountable, RouterBuilder};
use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ModuleManager>,
}

impl AppState {
    pub fn new(manager: Arc<ModuleManager>) -> Self {
        Self { manager }
    }
}

/// Module error rendered as a JSON body with a matching status
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            Error::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::DuplicateKey(_) | Error::CannotRemoveCurrent(_) | Error::InFlight(_) => {
                StatusCode::CONFLICT
            }
            Error::Engine(_) => StatusCode::BAD_GATEWAY,
            Error::Send(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        }));
        (self.status(), body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub path: String,
    pub unique: String,
}

#[derive(Debug, Deserialize)]
pub struct PluginAddRequest {
    pub path: String,
    pub unique: String,
    #[serde(default)]
    pub params: PluginParams,
}

#[derive(Debug, Deserialize)]
pub struct PluginUpdateRequest {
    #[serde(default)]
    pub params: PluginParams,
}

/// REST routes over the module operations
pub struct ApiRoutes;

impl Mountable for ApiRoutes {
    const PREFIX: &'static str = "/api";
    const NAME: &'static str = "api";

    fn routes(state: AppState) -> Router {
        create_router(state)
    }
}

/// Health, metrics and event push at the root
pub struct SystemRoutes;

impl Mountable for SystemRoutes {
    const PREFIX: &'static str = "";
    const NAME: &'static str = "system";

    fn routes(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/ws", get(ws::ws_handler))
            .with_state(state)
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/resource", get(list_resources).post(add_resource))
        .route("/resource/all", get(list_all_resources))
        .route("/resource/:unique", delete(remove_resource))
        .route("/output", get(list_outputs).post(add_output))
        .route("/output/:unique", delete(remove_output))
        .route("/plugin", get(list_plugins).post(add_plugin))
        .route("/plugin/:unique", put(update_plugin).delete(remove_plugin))
        .route("/play/stop", post(stop_play))
        .with_state(state)
}

/// Every route, without middleware. [`HttpServerBuilder`](crate::HttpServerBuilder)
/// adds the stack when it builds the server.
pub fn create_app(manager: Arc<ModuleManager>) -> Router {
    let (router, mounts) = RouterBuilder::new(AppState::new(manager))
        .mount::<ApiRoutes>()
        .mount::<SystemRoutes>()
        .build();
    debug!(?mounts, "HTTP routes assembled");
    router
}

// === Handlers ===

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "mediagate",
        "modules": state.manager.names(),
        "pending_waiters": state.manager.keeper().len(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Response {
    match state.manager.keeper().metrics().encode_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => ApiError(Error::internal(e.to_string())).into_response(),
    }
}

async fn list_resources(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.resource().list())
}

async fn list_all_resources(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.resource().all_list())
}

async fn add_resource(
    State(state): State<AppState>,
    Json(req): Json<AddRequest>,
) -> ApiResult<mg_core::Resource> {
    Ok(Json(state.manager.resource().add(&req.path, &req.unique).await?))
}

async fn remove_resource(
    State(state): State<AppState>,
    Path(unique): Path<String>,
) -> ApiResult<mg_core::Resource> {
    Ok(Json(state.manager.resource().remove(&unique).await?))
}

async fn list_outputs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.output().list())
}

async fn add_output(
    State(state): State<AppState>,
    Json(req): Json<AddRequest>,
) -> ApiResult<mg_core::Output> {
    Ok(Json(state.manager.output().add(&req.path, &req.unique).await?))
}

async fn remove_output(
    State(state): State<AppState>,
    Path(unique): Path<String>,
) -> ApiResult<mg_core::Output> {
    Ok(Json(state.manager.output().remove(&unique).await?))
}

async fn list_plugins(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.manager.plugin().list())
}

async fn add_plugin(
    State(state): State<AppState>,
    Json(req): Json<PluginAddRequest>,
) -> ApiResult<mg_core::Plugin> {
    Ok(Json(
        state
            .manager
            .plugin()
            .add(&req.path, &req.unique, req.params)
            .await?,
    ))
}

async fn update_plugin(
    State(state): State<AppState>,
    Path(unique): Path<String>,
    Json(req): Json<PluginUpdateRequest>,
) -> ApiResult<mg_core::Plugin> {
    Ok(Json(
        state.manager.plugin().update(&unique, req.params).await?,
    ))
}

async fn remove_plugin(
    State(state): State<AppState>,
    Path(unique): Path<String>,
) -> ApiResult<mg_core::Plugin> {
    Ok(Json(state.manager.plugin().remove(&unique).await?))
}

async fn stop_play(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    state.manager.play().stop().await?;
    Ok(Json(json!({ "stopped": true })))
}
