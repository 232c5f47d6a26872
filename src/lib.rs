//! # superfetch
//!
//! Virtual-to-physical page translation snapshots for Windows, built from
//! the memory manager's undocumented superfetch diagnostic interface.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(target_os = "windows")]
//! # fn main() -> superfetch::Result<()> {
//! use superfetch::MemoryMap;
//!
//! let map = MemoryMap::current()?;
//!
//! let value = 42u64;
//! let physical = map.translate(&value as *const u64 as u64);
//! println!("0x{:x}", physical);
//! # Ok(())
//! # }
//! # #[cfg(not(target_os = "windows"))]
//! # fn main() {}
//! ```
//!
//! ## How it works
//!
//! 1. The profiling and debug privileges are enabled. This lasts for the
//!    rest of the process lifetime.
//! 2. The kernel is asked for its physical memory ranges, trying the two
//!    known reply formats in turn.
//! 3. For every range, the kernel resolves each page frame to the virtual
//!    address mapped onto it, if any.
//! 4. The results are folded into an immutable [`MemoryMap`].
//!
//! A snapshot is all-or-nothing and is not updated afterwards.
//!
//! ## Platform Support
//!
//! - **Windows** (64-bit): `NtQuerySystemInformation`
//!
//! Other platforms compile, but have no kernel backend; callers can plug in
//! their own [`Kernel`](backend::Kernel).

mod builder;
mod error;
mod map;

pub mod backend;
pub mod identity;
pub mod privilege;
pub mod query;
pub mod ranges;

// Re-exports
pub use builder::{SnapshotBuilder, SnapshotConfig};
pub use error::{Error, Result};
pub use map::{page_base, page_offset, MemoryMap, Translations, PAGE_MASK, PAGE_SHIFT, PAGE_SIZE};
pub use ranges::{PhysicalRange, RangeFormat};

/// Check if the current platform has a kernel backend.
///
/// Returns `true` on 64-bit Windows. Whether a snapshot succeeds still
/// depends on the privileges of the process.
pub fn is_supported() -> bool {
    backend::is_available()
}

/// Get the name of the kernel backend for the current platform.
///
/// Returns `None` if no backend is available.
pub fn backend_name() -> Option<&'static str> {
    backend::name()
}
