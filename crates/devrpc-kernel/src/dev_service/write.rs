//! `Dev.Write`: write bytes to a device, optionally erasing first.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::Value;

use crate::rpc::{RpcError, RpcHandler, RpcResult};
use crate::vdev::DeviceRegistry;

use super::{device_error, empty_response, open_device, parse_args};

/// Handler for `Dev.Write {name, offset?, data, erase_len?}`.
pub struct WriteHandler {
    registry: Arc<DeviceRegistry>,
}

impl WriteHandler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default, Deserialize)]
struct WriteArgs {
    name: Option<String>,
    offset: Option<u64>,
    /// Base64-encoded bytes.
    data: Option<String>,
    erase_len: Option<u64>,
}

impl RpcHandler for WriteHandler {
    fn method(&self) -> &str {
        "Dev.Write"
    }

    fn description(&self) -> &str {
        "Write data at offset, erasing erase_len bytes first if non-zero"
    }

    #[tracing::instrument(skip(self, args), name = "rpc.dev_write")]
    fn call(&self, args: &Value) -> RpcResult<Value> {
        let args: WriteArgs = parse_args(args)?;
        let (Some(name), Some(data)) = (args.name, args.data) else {
            return Err(RpcError::bad_request("name and data are required"));
        };
        let data = BASE64
            .decode(data.as_bytes())
            .map_err(|e| RpcError::bad_request(format!("invalid data: {e}")))?;
        let offset = args.offset.unwrap_or(0);
        let erase_len = args.erase_len.unwrap_or(0);

        let dev = open_device(&self.registry, &name)?;

        if erase_len > 0 {
            dev.erase(offset, erase_len)
                .map_err(|e| device_error("erase", &name, e))?;
        }

        dev.write(offset, &data)
            .map_err(|e| device_error("write", &name, e))?;

        Ok(empty_response())
    }
}
