//! Raw FFI bindings to the undocumented parts of ntdll.
//!
//! Neither entry point is exposed by windows-rs, so they are declared here
//! and linked against ntdll directly. Prefer the [`NtKernel`](super::NtKernel)
//! wrapper.
//!
//! ## References
//!
//! - https://learn.microsoft.com/en-us/windows/win32/api/winternl/nf-winternl-ntquerysysteminformation

#![allow(non_snake_case)]
#![allow(non_camel_case_types)]

use std::ffi::c_void;

use windows::Win32::Foundation::{BOOLEAN, NTSTATUS};

/// `SYSTEM_INFORMATION_CLASS` value selecting the superfetch interface.
pub const SYSTEM_SUPERFETCH_INFORMATION: u32 = 79;

/// Interface version expected in every request envelope.
pub const SUPERFETCH_VERSION: u32 = 45;

/// Envelope tag, the multi-character literal `'kuhC'`.
pub const SUPERFETCH_MAGIC: u32 = u32::from_be_bytes(*b"kuhC");

/// Request envelope passed as the system information buffer.
#[repr(C)]
pub struct SUPERFETCH_INFORMATION {
    pub Version: u32,
    pub Magic: u32,
    pub InfoClass: u32,
    pub Data: *mut c_void,
    pub Length: u32,
}

#[link(name = "ntdll")]
extern "system" {
    pub fn NtQuerySystemInformation(
        SystemInformationClass: u32,
        SystemInformation: *mut c_void,
        SystemInformationLength: u32,
        ReturnLength: *mut u32,
    ) -> NTSTATUS;

    pub fn RtlAdjustPrivilege(
        Privilege: u32,
        Enable: BOOLEAN,
        CurrentThread: BOOLEAN,
        Enabled: *mut BOOLEAN,
    ) -> NTSTATUS;
}
