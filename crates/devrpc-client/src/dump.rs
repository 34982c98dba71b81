//! Chunked device dumps.

use std::time::{Duration, Instant};

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::constants::{MAX_CHUNK_SIZE, PROGRESS_BYTES, PROGRESS_INTERVAL_SECS};
use crate::rpc::{ClientError, DevClient};

/// Byte range to dump. A missing or zero `length` means the rest of the
/// device from `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DumpRange {
    pub offset: u64,
    pub length: Option<u64>,
}

/// Dump a device range into `out` with one `Dev.Read` per chunk.
///
/// `chunk_size` is clamped to `1..=MAX_CHUNK_SIZE`. Returns the number of
/// bytes written.
pub async fn dump_device<W: AsyncWrite + Unpin>(
    client: &mut DevClient,
    name: &str,
    range: DumpRange,
    chunk_size: u64,
    out: &mut W,
) -> Result<u64, ClientError> {
    let chunk_size = chunk_size.clamp(1, MAX_CHUNK_SIZE);
    let length = match range.length.filter(|&length| length > 0) {
        Some(length) => length,
        None => {
            let size = client.get_info(name).await?.size;
            size.saturating_sub(range.offset)
        }
    };
    tracing::info!(name, offset = range.offset, length, "dumping device");

    let interval = Duration::from_secs(PROGRESS_INTERVAL_SECS);
    let mut last_report = Instant::now();
    let mut offset = range.offset;
    let mut done = 0u64;
    while done < length {
        let read_len = (length - done).min(chunk_size);
        let data = client.read(name, offset, read_len).await?;
        out.write_all(&data).await?;

        offset += read_len;
        done += read_len;
        if done % PROGRESS_BYTES == 0 || last_report.elapsed() > interval {
            tracing::info!(
                "{} of {} ({:.2}%)",
                done,
                length,
                done as f64 * 100.0 / length as f64
            );
            last_report = Instant::now();
        }
    }
    out.flush().await?;

    tracing::info!(bytes = done, "done");
    Ok(done)
}

/// Parse an integer with an optional `0x`, `0o` or `0b` prefix.
pub fn parse_number(s: &str) -> Result<u64, std::num::ParseIntError> {
    let s = s.trim();
    let lower = s.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u64::from_str_radix(oct, 8)
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2)
    } else {
        s.parse()
    }
}
