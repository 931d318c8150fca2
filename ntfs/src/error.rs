//! Error types for NTFS operations

use core::fmt;

/// Result type for NTFS operations
pub type Result<T> = core::result::Result<T, NtfsError>;

/// Errors that can occur during NTFS operations
///
/// A well-formed search that finds nothing is reported as `Ok(None)` by the
/// lower layers; every variant here means the operation could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtfsError {
    /// Boot sector does not carry the NTFS signature
    InvalidSignature,

    /// Mapping pairs are truncated, overlong or point before cluster zero
    CorruptRunList,

    /// Update sequence check failed at a sector boundary
    FixupMismatch,

    /// On-disk structure is malformed or inconsistent
    CorruptVolume,

    /// A path component does not exist
    PathNotFound,

    /// Target record has no unnamed data attribute
    NoDataAttribute,

    /// Open mode other than read-only was requested
    AccessDenied,

    /// Seek target or mode is not supported
    InvalidArgument,

    /// Sector read failed
    IoError,

    /// Allocation of a transient buffer failed
    OutOfMemory,

    /// Data attribute is compressed or encrypted
    UnsupportedAttribute,
}

impl fmt::Display for NtfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSignature => write!(f, "Invalid NTFS signature"),
            Self::CorruptRunList => write!(f, "Corrupted data run list"),
            Self::FixupMismatch => write!(f, "Update sequence mismatch"),
            Self::CorruptVolume => write!(f, "Corrupted filesystem structure"),
            Self::PathNotFound => write!(f, "File or directory not found"),
            Self::NoDataAttribute => write!(f, "File has no data attribute"),
            Self::AccessDenied => write!(f, "Volume is read-only"),
            Self::InvalidArgument => write!(f, "Invalid argument"),
            Self::IoError => write!(f, "I/O error reading block device"),
            Self::OutOfMemory => write!(f, "Out of memory"),
            Self::UnsupportedAttribute => write!(f, "Compressed or encrypted attribute"),
        }
    }
}
