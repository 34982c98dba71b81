//! Virtual block device layer.
//!
//! Named, block-addressable storage devices (flash images and the like).
//! Key components:
//!
//! - [`DeviceOps`] - Core trait for device operations
//! - [`DeviceRegistry`] - Name → device table with type factories
//! - [`DeviceHandle`] - Open device guard, closed on drop
//! - [`MemoryDevice`] - In-memory flash (`RAM` type, testing)
//! - [`FileDevice`] - Host file image (`FILE` type)
//!
//! ## Design Decisions
//!
//! - **Offset/length addressing**: every call carries its position, so
//!   handles hold no cursor and can be released right after use.
//! - **Erase is explicit**: writes never erase implicitly; callers erase
//!   aligned regions first, like real NOR flash.
//! - **Zero-terminated erase sizes**: devices report granularities in a
//!   fixed table, ending at the first zero slot.

pub mod backends;
mod error;
mod ops;
mod registry;
mod types;

pub use backends::{FileDevice, MemoryDevice};
pub use error::{DevError, DevResult, ERR_CORRUPT, ERR_INVAL, ERR_IO, ERR_NOMEM, ERR_NOT_SUPPORTED};
pub use ops::DeviceOps;
pub(crate) use ops::check_range;
pub use registry::{DeviceFactory, DeviceHandle, DeviceRegistry, TYPE_FILE, TYPE_RAM};
pub use types::{DeviceInfo, EraseSizes, NUM_ERASE_SIZES, erase_size_list};
