//! devrpc server library
//!
//! Newline-delimited JSON RPC over TCP for the `Dev.*` methods.

pub mod codec;
pub mod config;
pub mod constants;
pub mod server;

pub use config::{ConfigError, DeviceConfig, ServerConfig};
pub use server::{DevRpcServer, ServerError, handle_frame};
