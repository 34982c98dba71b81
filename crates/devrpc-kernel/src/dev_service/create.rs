//! `Dev.Create`: create a device and register it under a name.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::rpc::{RpcError, RpcHandler, RpcResult};
use crate::vdev::DeviceRegistry;

use super::{empty_response, parse_args};

/// Handler for `Dev.Create {name, type, opts?}`.
pub struct CreateHandler {
    registry: Arc<DeviceRegistry>,
}

impl CreateHandler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default, Deserialize)]
struct CreateArgs {
    name: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    opts: Option<Value>,
}

/// Device options travel as a string; an object is accepted and re-encoded.
fn opts_string(opts: Option<Value>) -> String {
    match opts {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

impl RpcHandler for CreateHandler {
    fn method(&self) -> &str {
        "Dev.Create"
    }

    fn description(&self) -> &str {
        "Create a device of the given type and register it"
    }

    #[tracing::instrument(skip(self, args), name = "rpc.dev_create")]
    fn call(&self, args: &Value) -> RpcResult<Value> {
        let args: CreateArgs = parse_args(args)?;
        let (Some(name), Some(kind)) = (args.name, args.kind) else {
            return Err(RpcError::bad_request("name and type are required"));
        };
        let opts = opts_string(args.opts);

        if let Err(e) = self.registry.create_and_register(&kind, &opts, &name) {
            tracing::warn!(%name, %kind, error = %e, "dev creation failed");
            return Err(RpcError::server("dev creation failed"));
        }

        Ok(empty_response())
    }
}
