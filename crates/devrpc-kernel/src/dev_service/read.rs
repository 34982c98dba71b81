//! `Dev.Read`: read a byte range from a device.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::rpc::{RpcError, RpcHandler, RpcResult};
use crate::vdev::{DeviceRegistry, check_range};

use super::{device_error, open_device, parse_args, to_response};

/// Handler for `Dev.Read {name, offset?, len}`.
pub struct ReadHandler {
    registry: Arc<DeviceRegistry>,
}

impl ReadHandler {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self { registry }
    }
}

#[derive(Default, Deserialize)]
struct ReadArgs {
    name: Option<String>,
    offset: Option<u64>,
    len: Option<u64>,
}

/// Success payload of `Dev.Read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResponse {
    /// Base64-encoded bytes.
    pub data: String,
}

impl ReadResponse {
    /// Decode the payload bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}

/// Reserve room for `len` bytes without touching the pages. Returns the
/// length as `usize`, or `None` if the allocation cannot be made.
fn reserve_buffer(buf: &mut Vec<u8>, len: u64) -> Option<usize> {
    let len = usize::try_from(len).ok()?;
    buf.try_reserve_exact(len).ok()?;
    Some(len)
}

impl RpcHandler for ReadHandler {
    fn method(&self) -> &str {
        "Dev.Read"
    }

    fn description(&self) -> &str {
        "Read len bytes at offset from a device"
    }

    #[tracing::instrument(skip(self, args), name = "rpc.dev_read")]
    fn call(&self, args: &Value) -> RpcResult<Value> {
        let args: ReadArgs = parse_args(args)?;
        let (Some(name), Some(len)) = (args.name, args.len.filter(|&len| len > 0)) else {
            return Err(RpcError::bad_request("name and len are required"));
        };
        let offset = args.offset.unwrap_or(0);

        let dev = open_device(&self.registry, &name)?;
        let mut data = Vec::new();
        let buf_len = reserve_buffer(&mut data, len).ok_or_else(|| {
            tracing::warn!(%name, len, "read buffer allocation failed");
            RpcError::server("out of memory")
        })?;

        // Fill only once the range is known to be readable
        check_range(offset, len, dev.size()).map_err(|e| device_error("read", &name, e))?;
        data.resize(buf_len, 0);

        dev.read(offset, &mut data)
            .map_err(|e| device_error("read", &name, e))?;

        to_response(&ReadResponse {
            data: BASE64.encode(&data),
        })
    }
}
