//! Device backends.
//!
//! Backends implement [`DeviceOps`](crate::vdev::DeviceOps) for different
//! storage types.

mod file;
mod memory;

pub use file::{FileDevice, FileOpts};
pub use memory::{DEFAULT_ERASE_SIZE, ERASED_BYTE, MemoryDevice, MemoryOpts};

use serde::de::DeserializeOwned;

use crate::vdev::error::{DevError, DevResult};

/// Parse a device options string. An empty string means `{}`.
pub(crate) fn parse_opts<T: DeserializeOwned>(opts: &str) -> DevResult<T> {
    let opts = opts.trim();
    let opts = if opts.is_empty() { "{}" } else { opts };
    serde_json::from_str(opts).map_err(|e| DevError::invalid(format!("bad opts: {e}")))
}
