//! Probe-then-allocate query protocol and fixed-layout buffer helpers.
//!
//! Kernel structures are read and written at explicit byte offsets rather
//! than overlaid on the buffer. Windows targets are little-endian.

use tracing::trace;

use crate::backend::{Kernel, Status, SuperfetchInfoClass};

/// Parameters of one probe/allocate/requery exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizingProbe {
    pub class: SuperfetchInfoClass,
    /// Version tag written at offset 0 of both the probe and the real buffer.
    pub version: u32,
    /// Size of the intentionally undersized probe buffer.
    pub probe_len: usize,
    /// Status the kernel answers the probe with when it supports the request.
    pub too_small: Status,
}

/// Learn the reply size with an undersized probe, then reissue the query
/// with a buffer of exactly that size.
///
/// Returns `None` when the probe is not answered with `probe.too_small`, when
/// the reported length is implausible, or when the second query fails. None
/// of these are errors in their own right: they mean the request format is
/// not understood by the running kernel.
pub fn query_with_dynamic_sizing<K: Kernel + ?Sized>(
    kernel: &mut K,
    probe: &SizingProbe,
) -> Option<Vec<u8>> {
    let mut header = vec![0u8; probe.probe_len];
    write_u32(&mut header, 0, probe.version);

    // A success here could also be a complete reply that happened to fit the
    // probe. It is still reported as unsupported.
    let reply = kernel.query_superfetch(probe.class, &mut header);
    if reply.status != probe.too_small {
        trace!(
            class = ?probe.class,
            version = probe.version,
            status = %reply.status,
            "probe not answered with buffer-too-small"
        );
        return None;
    }

    let required = reply.return_length as usize;
    if required < probe.probe_len {
        trace!(
            class = ?probe.class,
            version = probe.version,
            required,
            "kernel reported a length smaller than the probe"
        );
        return None;
    }

    let mut buffer = vec![0u8; required];
    write_u32(&mut buffer, 0, probe.version);

    let reply = kernel.query_superfetch(probe.class, &mut buffer);
    if !reply.status.is_success() {
        trace!(
            class = ?probe.class,
            version = probe.version,
            status = %reply.status,
            "sized query failed"
        );
        return None;
    }

    Some(buffer)
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_u64(buf: &[u8], offset: usize) -> Option<u64> {
    let bytes = buf.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Callers size buffers before writing; out-of-range writes are a bug.
pub(crate) fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub(crate) fn write_u64(buf: &mut [u8], offset: usize, value: u64) {
    buf[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
}
