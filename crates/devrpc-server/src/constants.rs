//! Server configuration constants.
//!
//! Centralizes hardcoded values for easier configuration and documentation.

/// Default bind address (localhost only).
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8910";

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "devrpc.ron";

/// Longest accepted request line. Large enough for a base64 write of 1 MiB.
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// Default root for `FILE` device images.
pub const DEFAULT_IMAGE_DIR: &str = ".";
