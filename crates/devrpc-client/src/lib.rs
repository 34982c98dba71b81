//! devrpc client library
//!
//! Typed client for the `Dev.*` methods served by `devrpc-server`, plus the
//! chunked dump routine behind the `dump-device` tool.

pub mod constants;
pub mod dump;
pub mod rpc;

pub use dump::{DumpRange, dump_device, parse_number};
pub use rpc::{ClientError, DevClient};
