//! `Dev.*` RPC handlers.
//!
//! Translates six RPC methods into calls on the [`DeviceRegistry`]:
//!
//! | Method        | Required    | Optional              |
//! |---------------|-------------|-----------------------|
//! | `Dev.Create`  | name, type  | opts                  |
//! | `Dev.Read`    | name, len   | offset                |
//! | `Dev.Write`   | name, data  | offset, erase_len     |
//! | `Dev.Erase`   | name, len   | offset                |
//! | `Dev.Remove`  | name        |                       |
//! | `Dev.GetInfo` | name        |                       |
//!
//! Missing arguments fail with 400 before the registry is touched. Device
//! failures fail with 500; the device error code is embedded in the message
//! for read, write and erase. Each handler opens its device for the duration
//! of one call and releases it on every return path.

mod create;
mod erase;
mod get_info;
mod read;
mod remove;
mod write;

pub use create::CreateHandler;
pub use erase::EraseHandler;
pub use get_info::{DevInfo, GetInfoHandler};
pub use read::{ReadHandler, ReadResponse};
pub use remove::RemoveHandler;
pub use write::WriteHandler;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::rpc::{Dispatcher, RpcError, RpcResult};
use crate::vdev::{DevError, DeviceHandle, DeviceRegistry};

/// Register all `Dev.*` handlers with a dispatcher.
pub fn register(dispatcher: &mut Dispatcher, registry: Arc<DeviceRegistry>) {
    dispatcher.register(Arc::new(CreateHandler::new(registry.clone())));
    dispatcher.register(Arc::new(ReadHandler::new(registry.clone())));
    dispatcher.register(Arc::new(WriteHandler::new(registry.clone())));
    dispatcher.register(Arc::new(EraseHandler::new(registry.clone())));
    dispatcher.register(Arc::new(RemoveHandler::new(registry.clone())));
    dispatcher.register(Arc::new(GetInfoHandler::new(registry)));
}

/// Decode an argument object. `null` means no arguments.
fn parse_args<T: DeserializeOwned + Default>(args: &Value) -> RpcResult<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    T::deserialize(args).map_err(|e| RpcError::bad_request(format!("invalid args: {e}")))
}

fn open_device(registry: &DeviceRegistry, name: &str) -> RpcResult<DeviceHandle> {
    registry.open(name).ok_or_else(|| {
        tracing::warn!(name, "dev open failed");
        RpcError::server("dev open failed")
    })
}

/// Map a device failure to a 500 carrying the device error code.
fn device_error(op: &str, name: &str, e: DevError) -> RpcError {
    tracing::warn!(name, op, code = e.code(), error = %e, "device operation failed");
    RpcError::server(format!("{op} error: {}", e.code()))
}

fn empty_response() -> Value {
    Value::Object(serde_json::Map::new())
}

fn to_response<T: Serialize>(payload: &T) -> RpcResult<Value> {
    serde_json::to_value(payload).map_err(|e| RpcError::server(format!("encode error: {e}")))
}
