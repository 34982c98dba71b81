//! Core device types.

use serde::{Deserialize, Serialize};

/// Number of erase-size slots a device can report.
pub const NUM_ERASE_SIZES: usize = 8;

/// Fixed-capacity erase-size table. A zero entry terminates the list.
pub type EraseSizes = [u64; NUM_ERASE_SIZES];

/// Collect the leading non-zero entries of an erase-size table.
///
/// Enumeration stops at the first zero, even if later slots are set.
pub fn erase_size_list(sizes: &EraseSizes) -> Vec<u64> {
    sizes.iter().copied().take_while(|&s| s != 0).collect()
}

/// Summary of a registered device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Registered name (e.g. "ram0").
    pub name: String,
    /// Type the device was created with (e.g. "RAM").
    #[serde(rename = "type")]
    pub kind: String,
    /// Number of currently open handles.
    pub open_count: usize,
}
