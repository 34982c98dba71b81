//! Device operations trait.
//!
//! Offset/length based block access, shaped for RPC: every call carries its
//! own position, so no per-handle cursor state exists.

use super::types::EraseSizes;
use super::DevResult;

/// Core device operations.
///
/// Calls are synchronous and may block on the backing store. Implementations
/// serialize concurrent access internally.
pub trait DeviceOps: Send + Sync {
    /// Read `buf.len()` bytes starting at `offset` into `buf`.
    fn read(&self, offset: u64, buf: &mut [u8]) -> DevResult<()>;

    /// Write `data` starting at `offset`.
    fn write(&self, offset: u64, data: &[u8]) -> DevResult<()>;

    /// Erase `len` bytes starting at `offset`.
    fn erase(&self, offset: u64, len: u64) -> DevResult<()>;

    /// Device size in bytes.
    fn size(&self) -> u64;

    /// Fill `sizes` with the supported erase granularities.
    ///
    /// Unused slots must be left zero. The default reports none.
    fn erase_sizes(&self, sizes: &mut EraseSizes) -> DevResult<()> {
        let _ = sizes;
        Err(super::DevError::not_supported("erase sizes"))
    }
}

/// Check that `[offset, offset + len)` lies within a device of `size` bytes.
pub(crate) fn check_range(offset: u64, len: u64, size: u64) -> DevResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(super::DevError::invalid(format!(
            "range {offset}+{len} exceeds device size {size}"
        ))),
    }
}

/// Check that an erase request is aligned to `erase_size`.
pub(crate) fn check_aligned(offset: u64, len: u64, erase_size: u64) -> DevResult<()> {
    if erase_size == 0 || offset % erase_size != 0 || len % erase_size != 0 {
        return Err(super::DevError::invalid(format!(
            "erase {offset}+{len} not aligned to {erase_size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert!(check_range(0, 16, 16).is_ok());
        assert!(check_range(8, 9, 16).is_err());
        assert!(check_range(u64::MAX, 2, 16).is_err());
    }

    #[test]
    fn test_check_aligned() {
        assert!(check_aligned(4096, 8192, 4096).is_ok());
        assert!(check_aligned(100, 4096, 4096).is_err());
        assert!(check_aligned(0, 100, 4096).is_err());
        assert!(check_aligned(0, 0, 0).is_err());
    }
}
