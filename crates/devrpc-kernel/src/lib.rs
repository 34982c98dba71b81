//! # devrpc-kernel
//!
//! Block-device RPC core.
//!
//! - [`vdev`] owns named virtual devices (flash images) and their types
//! - [`rpc`] routes `(method, args)` calls to registered handlers
//! - [`dev_service`] exposes the device layer as `Dev.*` methods
//!
//! ```
//! use std::sync::Arc;
//! use devrpc_kernel::{DeviceRegistry, Dispatcher, dev_service};
//! use serde_json::json;
//!
//! let registry = Arc::new(DeviceRegistry::with_builtin_types());
//! let mut dispatcher = Dispatcher::new();
//! dev_service::register(&mut dispatcher, registry);
//!
//! dispatcher
//!     .dispatch("Dev.Create", &json!({"name": "ram0", "type": "RAM", "opts": {"size": 4096}}))
//!     .unwrap();
//! let info = dispatcher.dispatch("Dev.GetInfo", &json!({"name": "ram0"})).unwrap();
//! assert_eq!(info["size"], 4096);
//! ```

pub mod dev_service;
pub mod rpc;
pub mod vdev;

pub use dev_service::{DevInfo, ReadResponse};
pub use rpc::{Dispatcher, MethodInfo, RpcError, RpcHandler, RpcRequest, RpcResponse, RpcResult};
pub use vdev::{
    DevError, DevResult, DeviceHandle, DeviceInfo, DeviceOps, DeviceRegistry, EraseSizes,
    backends::{FileDevice, MemoryDevice},
};

/// Build a dispatcher with the `Dev.*` methods bound to `registry`.
pub fn dev_dispatcher(registry: std::sync::Arc<DeviceRegistry>) -> Dispatcher {
    let mut dispatcher = Dispatcher::new();
    dev_service::register(&mut dispatcher, registry);
    dispatcher
}
