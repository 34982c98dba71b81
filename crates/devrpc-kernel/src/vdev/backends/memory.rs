//! In-memory flash device.
//!
//! Used for the `RAM` device type and testing. All data is ephemeral.

use parking_lot::RwLock;
use serde::Deserialize;

use super::parse_opts;
use crate::vdev::error::{DevError, DevResult};
use crate::vdev::ops::{DeviceOps, check_aligned, check_range};
use crate::vdev::types::EraseSizes;

/// Default erase granularity for memory devices.
pub const DEFAULT_ERASE_SIZE: u64 = 4096;

/// Byte value of erased flash.
pub const ERASED_BYTE: u8 = 0xFF;

/// Options accepted by the `RAM` device type.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryOpts {
    /// Device size in bytes.
    pub size: u64,
    /// Erase granularity in bytes.
    #[serde(default = "default_erase_size")]
    pub erase_size: u64,
    /// Byte written by erase (and initial contents).
    #[serde(default = "default_fill")]
    pub fill: u8,
}

fn default_erase_size() -> u64 {
    DEFAULT_ERASE_SIZE
}

fn default_fill() -> u8 {
    ERASED_BYTE
}

/// In-memory flash image.
///
/// Thread-safe via internal `RwLock`. Erase requires alignment to the
/// configured erase size and resets bytes to the fill value.
#[derive(Debug)]
pub struct MemoryDevice {
    data: RwLock<Vec<u8>>,
    erase_size: u64,
    fill: u8,
}

impl MemoryDevice {
    /// Create a device of `size` bytes, filled with erased flash.
    pub fn new(size: u64, erase_size: u64) -> DevResult<Self> {
        Self::with_fill(size, erase_size, ERASED_BYTE)
    }

    /// Create a device of `size` bytes filled with `fill`.
    pub fn with_fill(size: u64, erase_size: u64, fill: u8) -> DevResult<Self> {
        if erase_size == 0 {
            return Err(DevError::invalid("erase_size must be non-zero"));
        }
        let len = usize::try_from(size).map_err(|_| DevError::NoMem)?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|_| DevError::NoMem)?;
        data.resize(len, fill);
        Ok(Self {
            data: RwLock::new(data),
            erase_size,
            fill,
        })
    }

    /// Build a device from a `RAM` type options string.
    pub fn from_opts(opts: &str) -> DevResult<Self> {
        let opts: MemoryOpts = parse_opts(opts)?;
        Self::with_fill(opts.size, opts.erase_size, opts.fill)
    }

    /// Copy of the full device contents.
    pub fn contents(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl DeviceOps for MemoryDevice {
    fn read(&self, offset: u64, buf: &mut [u8]) -> DevResult<()> {
        let data = self.data.read();
        check_range(offset, buf.len() as u64, data.len() as u64)?;
        let start = offset as usize;
        buf.copy_from_slice(&data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&self, offset: u64, src: &[u8]) -> DevResult<()> {
        let mut data = self.data.write();
        check_range(offset, src.len() as u64, data.len() as u64)?;
        let start = offset as usize;
        data[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn erase(&self, offset: u64, len: u64) -> DevResult<()> {
        check_aligned(offset, len, self.erase_size)?;
        let mut data = self.data.write();
        check_range(offset, len, data.len() as u64)?;
        let start = offset as usize;
        data[start..start + len as usize].fill(self.fill);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.data.read().len() as u64
    }

    fn erase_sizes(&self, sizes: &mut EraseSizes) -> DevResult<()> {
        sizes[0] = self.erase_size;
        Ok(())
    }
}
