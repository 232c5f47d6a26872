//! Physical memory range discovery.
//!
//! The layout of the range reply changed between Windows releases. Both
//! formats share the probe/allocate/requery exchange and differ only in the
//! version tag and the size of the fixed header in front of the range array.

use tracing::{debug, trace};

use crate::backend::{Kernel, Status, SuperfetchInfoClass};
use crate::map::PAGE_SHIFT;
use crate::query::{query_with_dynamic_sizing, read_u32, read_u64, SizingProbe};

/// Size of one `{ base_pfn, page_count }` entry.
pub const RANGE_ENTRY_SIZE: usize = 16;

/// A contiguous run of physical page frames backed by memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysicalRange {
    pub base_frame_number: u64,
    pub frame_count: u64,
}

impl PhysicalRange {
    pub fn new(base_frame_number: u64, frame_count: u64) -> Self {
        Self {
            base_frame_number,
            frame_count,
        }
    }

    /// First frame number past the end of the range.
    pub fn end_frame(&self) -> u64 {
        self.base_frame_number.saturating_add(self.frame_count)
    }

    pub fn contains_frame(&self, frame_number: u64) -> bool {
        frame_number >= self.base_frame_number && frame_number < self.end_frame()
    }

    /// Physical byte address of the first frame.
    pub fn base_address(&self) -> u64 {
        self.base_frame_number << PAGE_SHIFT
    }

    pub fn len_bytes(&self) -> u64 {
        self.frame_count << PAGE_SHIFT
    }
}

/// Versions of the memory range reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeFormat {
    /// `{ version, range_count, ranges[] }`
    V1,
    /// `{ version, flags, range_count, <pad>, ranges[] }`
    V2,
}

impl RangeFormat {
    /// Formats in the order they are tried by default.
    pub const ALL: [RangeFormat; 2] = [RangeFormat::V1, RangeFormat::V2];

    pub fn version(self) -> u32 {
        match self {
            RangeFormat::V1 => 1,
            RangeFormat::V2 => 2,
        }
    }

    fn count_offset(self) -> usize {
        match self {
            RangeFormat::V1 => 4,
            RangeFormat::V2 => 8,
        }
    }

    /// Offset of the range array.
    pub fn header_len(self) -> usize {
        match self {
            RangeFormat::V1 => 8,
            RangeFormat::V2 => 16,
        }
    }

    /// The fixed structure including its single declared array entry.
    pub fn probe_len(self) -> usize {
        self.header_len() + RANGE_ENTRY_SIZE
    }

    fn probe(self) -> SizingProbe {
        SizingProbe {
            class: SuperfetchInfoClass::MemoryRangesQuery,
            version: self.version(),
            probe_len: self.probe_len(),
            too_small: Status::BUFFER_TOO_SMALL,
        }
    }

    /// Decode a reply buffer in this format.
    ///
    /// Returns `None` if the reported range count runs past the end of the
    /// buffer.
    pub fn decode(self, buf: &[u8]) -> Option<Vec<PhysicalRange>> {
        let count = read_u32(buf, self.count_offset())? as usize;
        let end = count
            .checked_mul(RANGE_ENTRY_SIZE)?
            .checked_add(self.header_len())?;
        if end > buf.len() {
            return None;
        }

        (0..count)
            .map(|i| {
                let offset = self.header_len() + i * RANGE_ENTRY_SIZE;
                Some(PhysicalRange::new(
                    read_u64(buf, offset)?,
                    read_u64(buf, offset + 8)?,
                ))
            })
            .collect()
    }
}

/// Query the ranges using a single format.
pub fn query_ranges<K: Kernel + ?Sized>(kernel: &mut K, format: RangeFormat) -> Vec<PhysicalRange> {
    let Some(buffer) = query_with_dynamic_sizing(kernel, &format.probe()) else {
        return Vec::new();
    };

    match format.decode(&buffer) {
        Some(ranges) => ranges,
        None => {
            trace!(?format, len = buffer.len(), "range reply is truncated");
            Vec::new()
        }
    }
}

/// Discover the physical memory ranges, trying each format in turn until
/// one yields at least one range.
///
/// Returns an empty vector if every format fails.
pub fn discover<K: Kernel + ?Sized>(kernel: &mut K, formats: &[RangeFormat]) -> Vec<PhysicalRange> {
    for &format in formats {
        let ranges = query_ranges(kernel, format);
        if !ranges.is_empty() {
            debug!(?format, count = ranges.len(), "discovered physical memory ranges");
            return ranges;
        }
        debug!(?format, "range format yielded no ranges");
    }

    Vec::new()
}
