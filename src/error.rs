//! Error types for superfetch.

use thiserror::Error;

use crate::backend::Status;

/// Result type alias using superfetch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a memory map snapshot can fail.
///
/// Every failure is fatal for the snapshot in progress: no partially
/// populated map is ever handed back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// One of the profiling or debug privileges could not be enabled.
    #[error("failed to enable the profiling and debug privileges")]
    ElevationFailed,

    /// Neither range format produced any physical memory ranges.
    #[error("failed to query physical memory ranges")]
    RangeQueryFailed,

    /// The page frame identity query failed for a range.
    #[error("failed to query page frame identities for range at pfn 0x{base_frame_number:x}: {status}")]
    IdentityQueryFailed { base_frame_number: u64, status: Status },
}
