//! Client defaults.

/// Server address used when none is given.
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8910";

/// Bytes requested per `Dev.Read` call when dumping.
pub const DEFAULT_CHUNK_SIZE: u64 = 512;

/// Largest `Dev.Read` chunk the dump tool will request. Its base64
/// response stays well under [`MAX_RESPONSE_LEN`].
pub const MAX_CHUNK_SIZE: u64 = 16 * 1024 * 1024;

/// Longest response line accepted from the server. Base64 grows data by
/// 4/3, so single reads up to 48 MiB fit.
pub const MAX_RESPONSE_LEN: usize = 64 * 1024 * 1024;

/// Progress is reported every time this many bytes have been dumped.
pub const PROGRESS_BYTES: u64 = 65536;

/// Progress is also reported when this many seconds pass without a report.
pub const PROGRESS_INTERVAL_SECS: u64 = 5;
