//! Windows NT kernel backend.
//!
//! Talks to the memory manager through `NtQuerySystemInformation` with the
//! superfetch information class, and adjusts privileges through
//! `RtlAdjustPrivilege`.
//!
//! ## Requirements
//!
//! - 64-bit Windows
//! - An elevated (administrator) token, so that the profiling and debug
//!   privileges can be enabled

pub mod bindings;

use std::ffi::c_void;

use windows::Win32::Foundation::BOOLEAN;

use crate::backend::{Kernel, QueryReply, Status, SuperfetchInfoClass};
use crate::privilege::Privilege;

use bindings::*;

/// ntdll is mapped into every Windows process, so the backend is always
/// present. Whether the privileges can be enabled is only known at snapshot
/// time.
pub fn is_available() -> bool {
    cfg!(target_pointer_width = "64")
}

/// The live Windows kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NtKernel;

impl NtKernel {
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for NtKernel {
    fn adjust_privilege(
        &mut self,
        privilege: Privilege,
        enable: bool,
    ) -> std::result::Result<bool, Status> {
        let mut previous = BOOLEAN(0);
        let status = unsafe {
            RtlAdjustPrivilege(
                privilege.id(),
                BOOLEAN(enable as u8),
                BOOLEAN(0),
                &mut previous,
            )
        };

        let status = Status(status.0);
        if status.is_success() {
            Ok(previous.0 != 0)
        } else {
            Err(status)
        }
    }

    fn query_superfetch(&mut self, class: SuperfetchInfoClass, buffer: &mut [u8]) -> QueryReply {
        let Ok(length) = u32::try_from(buffer.len()) else {
            return QueryReply::new(Status::INVALID_PARAMETER, 0);
        };

        let mut info = SUPERFETCH_INFORMATION {
            Version: SUPERFETCH_VERSION,
            Magic: SUPERFETCH_MAGIC,
            InfoClass: class as u32,
            Data: buffer.as_mut_ptr() as *mut c_void,
            Length: length,
        };
        let mut return_length = 0u32;

        let status = unsafe {
            NtQuerySystemInformation(
                SYSTEM_SUPERFETCH_INFORMATION,
                &mut info as *mut _ as *mut c_void,
                std::mem::size_of::<SUPERFETCH_INFORMATION>() as u32,
                &mut return_length,
            )
        };

        QueryReply::new(Status(status.0), return_length)
    }
}
