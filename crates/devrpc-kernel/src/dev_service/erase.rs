//! `Dev.Erase`: erase a byte range on a device.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::rpc::{RpcError, RpcHandler, RpcResult};
use crate::vdev::DeviceRegistry;

use super::{device_error, empty_response, open_device, parse_args};

/// Handler for `Dev.Erase {name, offset?, len}`.
pub struct EraseHandler {
    registry: Arc<DeviceRegistry>,
}

impl EraseHandler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default, Deserialize)]
struct EraseArgs {
    name: Option<String>,
    offset: Option<u64>,
    len: Option<u64>,
}

impl RpcHandler for EraseHandler {
    fn method(&self) -> &str {
        "Dev.Erase"
    }

    fn description(&self) -> &str {
        "Erase len bytes at offset on a device"
    }

    #[tracing::instrument(skip(self, args), name = "rpc.dev_erase")]
    fn call(&self, args: &Value) -> RpcResult<Value> {
        let args: EraseArgs = parse_args(args)?;
        let (Some(name), Some(len)) = (args.name, args.len.filter(|&len| len > 0)) else {
            return Err(RpcError::bad_request("name and len are required"));
        };

        let dev = open_device(&self.registry, &name)?;
        dev.erase(args.offset.unwrap_or(0), len)
            .map_err(|e| device_error("erase", &name, e))?;

        Ok(empty_response())
    }
}
