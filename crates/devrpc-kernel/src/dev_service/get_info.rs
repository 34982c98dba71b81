//! `Dev.GetInfo`: report device size and erase geometry.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rpc::{RpcError, RpcHandler, RpcResult};
use crate::vdev::{DeviceRegistry, NUM_ERASE_SIZES, erase_size_list};

use super::{open_device, parse_args, to_response};

/// Handler for `Dev.GetInfo {name}`.
pub struct GetInfoHandler {
    registry: Arc<DeviceRegistry>,
}

impl GetInfoHandler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default, Deserialize)]
struct GetInfoArgs {
    name: Option<String>,
}

/// Success payload of `Dev.GetInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevInfo {
    /// Device size in bytes.
    pub size: u64,
    /// Supported erase sizes; absent when the device cannot report them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub erase_sizes: Option<Vec<u64>>,
}

impl RpcHandler for GetInfoHandler {
    fn method(&self) -> &str {
        "Dev.GetInfo"
    }

    fn description(&self) -> &str {
        "Get device size and supported erase sizes"
    }

    #[tracing::instrument(skip(self, args), name = "rpc.dev_get_info")]
    fn call(&self, args: &Value) -> RpcResult<Value> {
        let args: GetInfoArgs = parse_args(args)?;
        let Some(name) = args.name else {
            return Err(RpcError::bad_request("name is required"));
        };

        let dev = open_device(&self.registry, &name)?;
        let size = dev.size();

        let mut sizes = [0u64; NUM_ERASE_SIZES];
        let erase_sizes = match dev.erase_sizes(&mut sizes) {
            Ok(()) => Some(erase_size_list(&sizes)),
            Err(e) => {
                tracing::debug!(%name, error = %e, "erase sizes unavailable");
                None
            }
        };

        to_response(&DevInfo { size, erase_sizes })
    }
}
