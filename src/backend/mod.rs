//! Kernel query abstraction.
//!
//! Every stage of a snapshot talks to the memory manager through the
//! [`Kernel`] trait. The Windows implementation issues the real system calls;
//! on other platforms no backend exists and callers must supply their own.

use std::fmt;

use crate::privilege::Privilege;

#[cfg(target_os = "windows")]
pub mod nt;

#[cfg(test)]
pub(crate) mod sim;

/// Raw `NTSTATUS` code returned by a kernel call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(pub i32);

impl Status {
    pub const SUCCESS: Status = Status(0);
    pub const UNSUCCESSFUL: Status = Status(0xC000_0001_u32 as i32);
    pub const INFO_LENGTH_MISMATCH: Status = Status(0xC000_0004_u32 as i32);
    pub const INVALID_PARAMETER: Status = Status(0xC000_000D_u32 as i32);
    pub const BUFFER_TOO_SMALL: Status = Status(0xC000_0023_u32 as i32);
    pub const PRIVILEGE_NOT_HELD: Status = Status(0xC000_0061_u32 as i32);

    /// Success and informational codes both count as success.
    pub fn is_success(self) -> bool {
        self.0 >= 0
    }

    pub fn is_buffer_too_small(self) -> bool {
        self == Status::BUFFER_TOO_SMALL
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NTSTATUS 0x{:08X}", self.0 as u32)
    }
}

/// Superfetch information sub-classes.
///
/// Only [`MemoryRangesQuery`](Self::MemoryRangesQuery) and
/// [`PfnQuery`](Self::PfnQuery) are issued by this crate.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuperfetchInfoClass {
    RetrieveTrace = 1,
    SystemParameters = 2,
    LogEvent = 3,
    GenerateTrace = 4,
    Prefetch = 5,
    PfnQuery = 6,
    PfnSetPriority = 7,
    PrivSourceQuery = 8,
    SequenceNumberQuery = 9,
    ScenarioPhase = 10,
    WorkerPriority = 11,
    ScenarioQuery = 12,
    ScenarioPrefetch = 13,
    RobustnessControl = 14,
    TimeControl = 15,
    MemoryListQuery = 16,
    MemoryRangesQuery = 17,
    TracingControl = 18,
    TrimWhileAgingControl = 19,
}

/// Outcome of one superfetch query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryReply {
    pub status: Status,
    /// Length reported through the out-parameter. Only meaningful when the
    /// kernel rejects a buffer as too small.
    pub return_length: u32,
}

impl QueryReply {
    pub fn new(status: Status, return_length: u32) -> Self {
        Self {
            status,
            return_length,
        }
    }
}

/// The privileged calls a snapshot needs from the operating system.
///
/// Calls are synchronous and blocking. Implementations must not retain
/// `buffer` beyond the call.
pub trait Kernel {
    /// Enable or disable a process privilege.
    ///
    /// Returns whether the privilege was enabled before the call.
    fn adjust_privilege(
        &mut self,
        privilege: Privilege,
        enable: bool,
    ) -> std::result::Result<bool, Status>;

    /// Issue a superfetch information query over `buffer`, which the kernel
    /// reads the request from and writes the reply into.
    fn query_superfetch(&mut self, class: SuperfetchInfoClass, buffer: &mut [u8]) -> QueryReply;
}

/// Check if a real kernel backend exists on this platform.
pub fn is_available() -> bool {
    #[cfg(target_os = "windows")]
    {
        nt::is_available()
    }

    #[cfg(not(target_os = "windows"))]
    {
        false
    }
}

/// Get the name of the backend for this platform.
pub fn name() -> Option<&'static str> {
    #[cfg(target_os = "windows")]
    {
        Some("nt")
    }

    #[cfg(not(target_os = "windows"))]
    {
        None
    }
}
