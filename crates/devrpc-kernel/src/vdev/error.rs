//! Device error types.

use std::io;
use thiserror::Error;

/// Numeric code for invalid arguments (range, alignment, options).
pub const ERR_INVAL: i32 = -1;
/// Numeric code for allocation failures.
pub const ERR_NOMEM: i32 = -2;
/// Numeric code for corrupted device contents.
pub const ERR_CORRUPT: i32 = -3;
/// Numeric code for I/O failures in the backing store.
pub const ERR_IO: i32 = -10;
/// Numeric code for operations the device does not implement.
pub const ERR_NOT_SUPPORTED: i32 = -20;

/// Device error type.
#[derive(Debug, Error)]
pub enum DevError {
    /// Invalid argument: out of range, misaligned, bad options.
    #[error("invalid argument: {0}")]
    Invalid(String),

    /// Could not allocate a buffer.
    #[error("out of memory")]
    NoMem,

    /// Device contents are corrupt.
    #[error("corrupt: {0}")]
    Corrupt(String),

    /// Operation not implemented by this device.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// No device registered under this name.
    #[error("no such device: {0}")]
    NotFound(String),

    /// A device with this name is already registered.
    #[error("device already exists: {0}")]
    AlreadyExists(String),

    /// Device still has open handles.
    #[error("device busy: {0}")]
    Busy(String),

    /// No factory for this device type.
    #[error("unknown device type: {0}")]
    UnknownType(String),

    /// I/O error from the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl DevError {
    /// Create an Invalid error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// Create a Corrupt error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }

    /// Create a NotSupported error.
    pub fn not_supported(msg: impl Into<String>) -> Self {
        Self::NotSupported(msg.into())
    }

    /// Create a NotFound error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create an AlreadyExists error.
    pub fn already_exists(name: impl Into<String>) -> Self {
        Self::AlreadyExists(name.into())
    }

    /// Create a Busy error.
    pub fn busy(name: impl Into<String>) -> Self {
        Self::Busy(name.into())
    }

    /// Numeric device error code, as reported in RPC error messages.
    ///
    /// Registry-level failures have no code of their own and report as
    /// invalid arguments.
    pub fn code(&self) -> i32 {
        match self {
            DevError::Invalid(_)
            | DevError::NotFound(_)
            | DevError::AlreadyExists(_)
            | DevError::Busy(_)
            | DevError::UnknownType(_) => ERR_INVAL,
            DevError::NoMem => ERR_NOMEM,
            DevError::Corrupt(_) => ERR_CORRUPT,
            DevError::NotSupported(_) => ERR_NOT_SUPPORTED,
            DevError::Io(_) => ERR_IO,
        }
    }
}

/// Device result type.
pub type DevResult<T> = Result<T, DevError>;
