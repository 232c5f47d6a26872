//! Page frame identity queries.
//!
//! For each physical range the kernel is handed a `PF_PFN_PRIO_REQUEST`
//! listing every frame number in the range, and fills in one
//! `MMPFN_IDENTITY` per frame. Only the frame number and the virtual address
//! union member are decoded; the bit-field union in front of them is ignored.
//!
//! Request layout:
//!
//! ```text
//! 0x000  u32  version            (1)
//! 0x004  u32  request flags      (1, resolve identity)
//! 0x008  u64  pfn count
//! 0x010  SYSTEM_MEMORY_LIST_INFORMATION (176 bytes, output only)
//! 0x0c0  MMPFN_IDENTITY[pfn count]     (24 bytes each)
//! ```

use tracing::{debug, warn};

use crate::backend::{Kernel, Status, SuperfetchInfoClass};
use crate::error::{Error, Result};
use crate::map::PAGE_SHIFT;
use crate::query::{read_u64, write_u32, write_u64};
use crate::ranges::PhysicalRange;

pub const PFN_REQUEST_VERSION: u32 = 1;
pub const PFN_REQUEST_RESOLVE_IDENTITY: u32 = 1;

/// `SYSTEM_MEMORY_LIST_INFORMATION`: five counters, two arrays of eight
/// priorities and one trailing counter, all pointer sized.
pub const MEMORY_LIST_INFO_SIZE: usize = 22 * 8;

/// Offset of the identity array.
pub const PFN_REQUEST_HEADER_SIZE: usize = 16 + MEMORY_LIST_INFO_SIZE;

/// Size of one `MMPFN_IDENTITY`.
pub const IDENTITY_SIZE: usize = 24;

const PFN_COUNT_OFFSET: usize = 8;
const FRAME_INDEX_OFFSET: usize = 8;
const VIRTUAL_ADDRESS_OFFSET: usize = 16;

/// The decoded part of one `MMPFN_IDENTITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameIdentity {
    /// Frame number as echoed back by the kernel.
    pub page_frame_index: u64,
    /// Virtual address mapped to the frame, if the kernel resolved one.
    pub virtual_address: Option<u64>,
}

/// Exact request size for `frame_count` frames.
///
/// Returns `None` when the size overflows or cannot be described by the
/// kernel interface's 32-bit length field.
pub fn request_len(frame_count: u64) -> Option<usize> {
    let slots = usize::try_from(frame_count).ok()?.checked_mul(IDENTITY_SIZE)?;
    let len = slots.checked_add(PFN_REQUEST_HEADER_SIZE)?;
    u32::try_from(len).ok()?;
    Some(len)
}

/// Build the request buffer for `range`, with every slot pre-populated with
/// the frame number it asks about.
pub fn encode_request(range: &PhysicalRange) -> Option<Vec<u8>> {
    range.base_frame_number.checked_add(range.frame_count)?;
    let mut buf = vec![0u8; request_len(range.frame_count)?];
    write_u32(&mut buf, 0, PFN_REQUEST_VERSION);
    write_u32(&mut buf, 4, PFN_REQUEST_RESOLVE_IDENTITY);
    write_u64(&mut buf, PFN_COUNT_OFFSET, range.frame_count);

    for (i, slot) in buf[PFN_REQUEST_HEADER_SIZE..]
        .chunks_exact_mut(IDENTITY_SIZE)
        .enumerate()
    {
        write_u64(slot, FRAME_INDEX_OFFSET, range.base_frame_number + i as u64);
    }

    Some(buf)
}

/// Decode one identity slot. `slot` must be at least [`IDENTITY_SIZE`] bytes.
pub fn decode_identity(slot: &[u8]) -> Option<FrameIdentity> {
    let page_frame_index = read_u64(slot, FRAME_INDEX_OFFSET)?;
    let virtual_address = read_u64(slot, VIRTUAL_ADDRESS_OFFSET)?;

    Some(FrameIdentity {
        page_frame_index,
        virtual_address: (virtual_address != 0).then_some(virtual_address),
    })
}

/// Resolve every frame of `range` and return `(virtual_address,
/// physical_address)` pairs for the frames that have a virtual mapping.
///
/// The physical address is derived from the requested frame number, not the
/// one echoed back by the kernel.
pub fn resolve<K: Kernel + ?Sized>(kernel: &mut K, range: &PhysicalRange) -> Result<Vec<(u64, u64)>> {
    let failed = |status| Error::IdentityQueryFailed {
        base_frame_number: range.base_frame_number,
        status,
    };

    let Some(mut buf) = encode_request(range) else {
        warn!(?range, "range too large for a single identity query");
        return Err(failed(Status::INVALID_PARAMETER));
    };

    let reply = kernel.query_superfetch(SuperfetchInfoClass::PfnQuery, &mut buf);
    if !reply.status.is_success() {
        warn!(?range, status = %reply.status, "identity query failed");
        return Err(failed(reply.status));
    }

    let mut resolved = Vec::new();
    for (i, slot) in buf[PFN_REQUEST_HEADER_SIZE..]
        .chunks_exact(IDENTITY_SIZE)
        .enumerate()
    {
        if let Some(FrameIdentity {
            virtual_address: Some(virtual_address),
            ..
        }) = decode_identity(slot)
        {
            let frame = range.base_frame_number + i as u64;
            resolved.push((virtual_address, frame << PAGE_SHIFT));
        }
    }

    debug!(
        base = range.base_frame_number,
        frames = range.frame_count,
        resolved = resolved.len(),
        "resolved page frame identities"
    );
    Ok(resolved)
}
