//! JSON-RPC 2.0 wire types
//!
//! Module failures are reported with application codes in the -32000 range;
//! `error.data.kind` repeats the stable error code the HTTP surface uses.

use mg_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
    /// Sent without an `id`; never answered
    #[serde(skip)]
    notification: bool,
}

impl JsonRpcRequest {
    pub fn new(method: impl Into<String>, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            method: method.into(),
            params,
            id,
            notification: false,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.notification
    }

    /// Decode a request, answering `INVALID_REQUEST` with the original id
    /// when the shape is wrong
    pub fn from_value(value: Value) -> Result<Self, JsonRpcResponse> {
        let notification = value.get("id").is_none();
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let mut request: Self = serde_json::from_value(value).map_err(|e| {
            JsonRpcResponse::error(
                id.clone(),
                error_codes::INVALID_REQUEST,
                format!("Invalid request: {}", e),
            )
        })?;
        if request.jsonrpc != VERSION {
            return Err(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version {:?}", request.jsonrpc),
            ));
        }
        request.notification = notification;
        Ok(request)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
            id,
        }
    }

    /// Failed module operation
    pub fn from_error(id: Value, err: &Error) -> Self {
        let mut response = Self::error(id, error_codes::for_error(err), err.to_string());
        if let Some(error) = response.error.as_mut() {
            error.data = Some(json!({ "kind": err.code() }));
        }
        response
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

pub mod error_codes {
    use mg_core::Error;

    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const ENGINE_FAILURE: i32 = -32000;
    pub const SEND_FAILURE: i32 = -32001;
    pub const NOT_FOUND: i32 = -32002;
    pub const TIMEOUT: i32 = -32003;
    pub const DUPLICATE_KEY: i32 = -32004;
    pub const CANNOT_REMOVE_CURRENT: i32 = -32005;
    pub const IN_FLIGHT: i32 = -32006;

    pub fn for_error(err: &Error) -> i32 {
        match err {
            Error::Engine(_) => ENGINE_FAILURE,
            Error::Send(_) => SEND_FAILURE,
            Error::NotFound(_) => NOT_FOUND,
            Error::Timeout(_) => TIMEOUT,
            Error::DuplicateKey(_) => DUPLICATE_KEY,
            Error::CannotRemoveCurrent(_) => CANNOT_REMOVE_CURRENT,
            Error::InFlight(_) => IN_FLIGHT,
            Error::InvalidArgument(_) => INVALID_PARAMS,
            _ => INTERNAL_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_omits_error() {
        let resp = JsonRpcResponse::success(json!(1), json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn test_module_errors_map_to_codes() {
        let resp = JsonRpcResponse::from_error(json!(7), &Error::cannot_remove_current("r1"));
        let error = resp.error.unwrap();
        assert_eq!(error.code, error_codes::CANNOT_REMOVE_CURRENT);
        assert_eq!(error.data.unwrap()["kind"], "cannot_remove_current");

        assert_eq!(
            error_codes::for_error(&Error::invalid_argument("path")),
            error_codes::INVALID_PARAMS
        );
        assert_eq!(
            error_codes::for_error(&Error::internal("x")),
            error_codes::INTERNAL_ERROR
        );
    }

    #[test]
    fn test_bad_requests_keep_their_id() {
        let err = JsonRpcRequest::from_value(json!({"id": 5, "params": {}})).unwrap_err();
        assert_eq!(err.id, json!(5));
        assert_eq!(err.error.unwrap().code, error_codes::INVALID_REQUEST);

        let err =
            JsonRpcRequest::from_value(json!({"jsonrpc": "1.0", "method": "output.list", "id": 6}))
                .unwrap_err();
        assert_eq!(err.id, json!(6));
    }

    #[test]
    fn test_missing_id_marks_a_notification() {
        let request =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "output.list"})).unwrap();
        assert!(request.is_notification());
        assert_eq!(request.id, Value::Null);

        let request =
            JsonRpcRequest::from_value(json!({"jsonrpc": "2.0", "method": "output.list", "id": null}))
                .unwrap();
        assert!(!request.is_notification());

        assert!(!JsonRpcRequest::new("output.list", Value::Null, json!(1)).is_notification());
    }
}
