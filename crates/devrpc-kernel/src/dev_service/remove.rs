//! `Dev.Remove`: unregister a device.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::rpc::{RpcError, RpcHandler, RpcResult};
use crate::vdev::DeviceRegistry;

use super::{empty_response, parse_args};

/// Handler for `Dev.Remove {name}`.
pub struct RemoveHandler {
    registry: Arc<DeviceRegistry>,
}

impl RemoveHandler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default, Deserialize)]
struct RemoveArgs {
    name: Option<String>,
}

impl RpcHandler for RemoveHandler {
    fn method(&self) -> &str {
        "Dev.Remove"
    }

    fn description(&self) -> &str {
        "Unregister a device"
    }

    #[tracing::instrument(skip(self, args), name = "rpc.dev_remove")]
    fn call(&self, args: &Value) -> RpcResult<Value> {
        let args: RemoveArgs = parse_args(args)?;
        let Some(name) = args.name else {
            return Err(RpcError::bad_request("name is required"));
        };

        if let Err(e) = self.registry.unregister(&name) {
            tracing::warn!(%name, error = %e, "dev removal failed");
            return Err(RpcError::server("dev removal failed"));
        }

        Ok(empty_response())
    }
}
