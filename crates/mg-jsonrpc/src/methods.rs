//! Method table mapping JSON-RPC calls onto module operations

use mg_core::{PluginParams, Result};
use mg_modules::ModuleManager;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::protocol::{error_codes, JsonRpcRequest, JsonRpcResponse};

/// Every method this server answers
pub const METHODS: &[&str] = &[
    "resource.add",
    "resource.remove",
    "resource.list",
    "resource.all_list",
    "output.add",
    "output.remove",
    "output.list",
    "plugin.add",
    "plugin.remove",
    "plugin.list",
    "plugin.update",
    "play.stop",
    "server.info",
];

#[derive(Debug, Deserialize)]
struct AddParams {
    path: String,
    unique: String,
}

#[derive(Debug, Deserialize)]
struct UniqueParams {
    unique: String,
}

#[derive(Debug, Deserialize)]
struct PluginAddParams {
    path: String,
    unique: String,
    #[serde(default)]
    params: PluginParams,
}

#[derive(Debug, Deserialize)]
struct PluginUpdateParams {
    unique: String,
    #[serde(default)]
    params: PluginParams,
}

fn params<T: DeserializeOwned>(request: &JsonRpcRequest) -> std::result::Result<T, JsonRpcResponse> {
    serde_json::from_value(request.params.clone()).map_err(|e| {
        JsonRpcResponse::error(
            request.id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Invalid params for {}: {}", request.method, e),
        )
    })
}

fn respond<T: Serialize>(id: Value, result: Result<T>) -> JsonRpcResponse {
    match result.and_then(|value| Ok(serde_json::to_value(value)?)) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::from_error(id, &e),
    }
}

macro_rules! parse {
    ($request:expr) => {
        match params(&$request) {
            Ok(p) => p,
            Err(resp) => return resp,
        }
    };
}

/// Run one request against the modules
pub async fn call(manager: &ModuleManager, request: JsonRpcRequest) -> JsonRpcResponse {
    let id = request.id.clone();

    match request.method.as_str() {
        "resource.add" => {
            let p: AddParams = parse!(request);
            respond(id, manager.resource().add(&p.path, &p.unique).await)
        }
        "resource.remove" => {
            let p: UniqueParams = parse!(request);
            respond(id, manager.resource().remove(&p.unique).await)
        }
        "resource.list" => respond(id, Ok(manager.resource().list())),
        "resource.all_list" => respond(id, Ok(manager.resource().all_list())),

        "output.add" => {
            let p: AddParams = parse!(request);
            respond(id, manager.output().add(&p.path, &p.unique).await)
        }
        "output.remove" => {
            let p: UniqueParams = parse!(request);
            respond(id, manager.output().remove(&p.unique).await)
        }
        "output.list" => respond(id, Ok(manager.output().list())),

        "plugin.add" => {
            let p: PluginAddParams = parse!(request);
            respond(id, manager.plugin().add(&p.path, &p.unique, p.params).await)
        }
        "plugin.remove" => {
            let p: UniqueParams = parse!(request);
            respond(id, manager.plugin().remove(&p.unique).await)
        }
        "plugin.list" => respond(id, Ok(manager.plugin().list())),
        "plugin.update" => {
            let p: PluginUpdateParams = parse!(request);
            respond(id, manager.plugin().update(&p.unique, p.params).await)
        }

        "play.stop" => respond(
            id,
            manager.play().stop().await.map(|()| json!({ "stopped": true })),
        ),

        "server.info" => JsonRpcResponse::success(
            id,
            json!({
                "name": "mediagate JSON-RPC Server",
                "version": env!("CARGO_PKG_VERSION"),
                "modules": manager.names(),
                "methods": METHODS,
            }),
        ),

        other => JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown method: {}", other),
        ),
    }
}
