//! RPC dispatcher and error type.
//!
//! Handlers are registered by method name (e.g. `Dev.Read`) and receive the
//! request's JSON arguments. Transport framing lives elsewhere; this module
//! only routes a decoded `(method, args)` pair to its handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Code for missing or invalid arguments.
pub const CODE_BAD_REQUEST: i32 = 400;
/// Code for unknown methods.
pub const CODE_NOT_FOUND: i32 = 404;
/// Code for failures reported by the handler's collaborators.
pub const CODE_SERVER_ERROR: i32 = 500;

/// Error returned to the caller of an RPC.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RpcError {
    /// Numeric error code (400, 404, 500).
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

impl RpcError {
    /// Create an error with an arbitrary code.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Missing or invalid argument (400).
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(CODE_BAD_REQUEST, message)
    }

    /// Unknown method (404).
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(CODE_NOT_FOUND, message)
    }

    /// Collaborator failure (500).
    pub fn server(message: impl Into<String>) -> Self {
        Self::new(CODE_SERVER_ERROR, message)
    }
}

/// RPC result type.
pub type RpcResult<T> = Result<T, RpcError>;

/// One request frame: a method name plus its argument object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Caller-chosen id, echoed in the response.
    #[serde(default)]
    pub id: u64,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, args: Value) -> Self {
        Self {
            id,
            method: method.into(),
            args,
        }
    }
}

/// One response frame: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Wrap a handler outcome.
    pub fn from_result(id: u64, result: RpcResult<Value>) -> Self {
        match result {
            Ok(value) => Self {
                id,
                result: Some(value),
                error: None,
            },
            Err(error) => Self {
                id,
                result: None,
                error: Some(error),
            },
        }
    }

    /// Unwrap into a handler outcome. A frame with neither field is an
    /// empty success.
    pub fn into_result(self) -> RpcResult<Value> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(value)) => Ok(value),
            (None, None) => Ok(Value::Object(serde_json::Map::new())),
        }
    }
}

/// A named RPC method.
pub trait RpcHandler: Send + Sync {
    /// Method name, e.g. `Dev.Read`.
    fn method(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Handle one call.
    ///
    /// `args` is the request's argument object (`Value::Null` when the
    /// caller sent none). Returns the success payload.
    fn call(&self, args: &Value) -> RpcResult<Value>;
}

/// Information about a registered method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    pub name: String,
    pub description: String,
}

/// Routes calls to registered handlers by method name.
#[derive(Default)]
pub struct Dispatcher {
    handlers: BTreeMap<String, Arc<dyn RpcHandler>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its method name, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn RpcHandler>) {
        self.handlers.insert(handler.method().to_string(), handler);
    }

    /// Get the handler for a method.
    pub fn get(&self, method: &str) -> Option<Arc<dyn RpcHandler>> {
        self.handlers.get(method).cloned()
    }

    /// List registered methods, sorted by name.
    pub fn list(&self) -> Vec<MethodInfo> {
        self.handlers
            .values()
            .map(|h| MethodInfo {
                name: h.method().to_string(),
                description: h.description().to_string(),
            })
            .collect()
    }

    /// Route a call to its handler.
    pub fn dispatch(&self, method: &str, args: &Value) -> RpcResult<Value> {
        match self.handlers.get(method) {
            Some(handler) => handler.call(args),
            None => Err(RpcError::not_found(format!("No handler for {method}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    impl RpcHandler for Echo {
        fn method(&self) -> &str {
            "Test.Echo"
        }

        fn description(&self) -> &str {
            "Echo arguments back"
        }

        fn call(&self, args: &Value) -> RpcResult<Value> {
            Ok(args.clone())
        }
    }

    #[test]
    fn test_dispatch() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(Echo));

        let result = dispatcher.dispatch("Test.Echo", &json!({"a": 1})).unwrap();
        assert_eq!(result, json!({"a": 1}));
    }

    #[test]
    fn test_unknown_method() {
        let dispatcher = Dispatcher::new();
        let err = dispatcher.dispatch("Test.Nope", &Value::Null).unwrap_err();
        assert_eq!(err.code, CODE_NOT_FOUND);
        assert_eq!(err.message, "No handler for Test.Nope");
    }

    #[test]
    fn test_list() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(Arc::new(Echo));
        assert!(dispatcher.get("Test.Echo").is_some());
        assert_eq!(
            dispatcher.list(),
            vec![MethodInfo {
                name: "Test.Echo".into(),
                description: "Echo arguments back".into(),
            }]
        );
    }

    #[test]
    fn test_request_defaults() {
        let req: RpcRequest = serde_json::from_str(r#"{"method": "Dev.GetInfo"}"#).unwrap();
        assert_eq!(req.id, 0);
        assert_eq!(req.args, Value::Null);
    }

    #[test]
    fn test_response_frames() {
        let ok = RpcResponse::from_result(7, Ok(json!({"size": 1})));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"id": 7, "result": {"size": 1}})
        );

        let err = RpcResponse::from_result(8, Err(RpcError::server("dev open failed")));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"id": 8, "error": {"code": 500, "message": "dev open failed"}})
        );
        assert_eq!(err.into_result().unwrap_err().code, CODE_SERVER_ERROR);
    }

    #[test]
    fn test_error_serialization() {
        let err = RpcError::bad_request("name is required");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, json!({"code": 400, "message": "name is required"}));
        assert_eq!(err.to_string(), "400: name is required");
    }
}
