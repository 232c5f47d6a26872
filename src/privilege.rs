//! Process privilege elevation.
//!
//! The superfetch page frame queries are refused unless the calling process
//! holds both the single-process profiling privilege and the debug
//! privilege. Elevation is one-way: privileges enabled here stay enabled for
//! the remaining lifetime of the process, and no corresponding lowering is
//! provided.

use tracing::{debug, warn};

use crate::backend::Kernel;

/// Privileges required by the superfetch queries.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// `SeProfileSingleProcessPrivilege`
    ProfileSingleProcess = 13,
    /// `SeDebugPrivilege`
    Debug = 20,
}

impl Privilege {
    /// Privileges enabled by [`elevate`], in the order they are requested.
    pub const REQUIRED: [Privilege; 2] = [Privilege::ProfileSingleProcess, Privilege::Debug];

    /// The numeric privilege identifier (LUID low part).
    pub fn id(self) -> u32 {
        self as u32
    }
}

/// Enable every privilege in [`Privilege::REQUIRED`] for the calling process.
///
/// Stops at the first privilege that cannot be enabled. Returns `false` on
/// any failure without saying which privilege was refused.
pub fn elevate<K: Kernel + ?Sized>(kernel: &mut K) -> bool {
    for privilege in Privilege::REQUIRED {
        match kernel.adjust_privilege(privilege, true) {
            Ok(was_enabled) => {
                debug!(?privilege, was_enabled, "privilege enabled");
            }
            Err(status) => {
                warn!(?privilege, %status, "failed to enable privilege");
                return false;
            }
        }
    }

    true
}
