//! Scripted kernel for exercising the query protocol off-Windows.
//!
//! Speaks the same byte layouts as the real superfetch interface and records
//! every query it receives.

use std::collections::{HashMap, HashSet};

use crate::backend::{Kernel, QueryReply, Status, SuperfetchInfoClass};
use crate::identity::{IDENTITY_SIZE, PFN_REQUEST_HEADER_SIZE};
use crate::privilege::Privilege;
use crate::query::{read_u32, read_u64, write_u32, write_u64};
use crate::ranges::{PhysicalRange, RangeFormat, RANGE_ENTRY_SIZE};

/// How the simulated kernel answers one range format.
#[derive(Debug, Clone)]
pub(crate) enum RangeReply {
    /// Every query, including the probe, returns this status.
    Unsupported(Status),
    /// The probe is answered normally, the sized query returns this status.
    RequeryFails(Status),
    Ranges(Vec<PhysicalRange>),
    /// Writes `ranges` but reports `claimed` as the range count.
    Overstated {
        ranges: Vec<PhysicalRange>,
        claimed: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Call {
    pub class: SuperfetchInfoClass,
    /// The u32 at offset 0 of the request.
    pub version: u32,
    pub length: usize,
}

#[derive(Debug)]
pub(crate) struct SimKernel {
    pub denied_privilege: Option<Privilege>,
    pub adjusted: Vec<Privilege>,
    pub v1: RangeReply,
    pub v2: RangeReply,
    /// Frame number to mapped virtual address.
    pub mappings: HashMap<u64, u64>,
    /// Identity queries containing any of these frames fail.
    pub failing_frames: HashSet<u64>,
    /// Added to the frame number echoed back in each identity slot.
    pub echo_frame_offset: u64,
    pub calls: Vec<Call>,
}

impl SimKernel {
    pub fn new() -> Self {
        Self {
            denied_privilege: None,
            adjusted: Vec::new(),
            v1: RangeReply::Unsupported(Status::INVALID_PARAMETER),
            v2: RangeReply::Unsupported(Status::INVALID_PARAMETER),
            mappings: HashMap::new(),
            failing_frames: HashSet::new(),
            echo_frame_offset: 0,
            calls: Vec::new(),
        }
    }

    fn query_ranges(&self, buf: &mut [u8]) -> QueryReply {
        let (format, reply) = match read_u32(buf, 0) {
            Some(1) => (RangeFormat::V1, &self.v1),
            Some(2) => (RangeFormat::V2, &self.v2),
            _ => return QueryReply::new(Status::INVALID_PARAMETER, 0),
        };
        let count_offset = match format {
            RangeFormat::V1 => 4,
            RangeFormat::V2 => 8,
        };

        // The first query of each format is always answered as a size probe,
        // even when the reply would have fit.
        let is_probe = self
            .calls
            .iter()
            .filter(|c| c.class == SuperfetchInfoClass::MemoryRangesQuery)
            .filter(|c| c.version == format.version())
            .count()
            == 1;

        let (ranges, claimed) = match reply {
            RangeReply::Unsupported(status) => return QueryReply::new(*status, 0),
            RangeReply::RequeryFails(status) => {
                if is_probe {
                    let required = format.probe_len() + RANGE_ENTRY_SIZE;
                    return QueryReply::new(Status::BUFFER_TOO_SMALL, required as u32);
                }
                return QueryReply::new(*status, 0);
            }
            RangeReply::Ranges(ranges) => (ranges, ranges.len() as u32),
            RangeReply::Overstated { ranges, claimed } => (ranges, *claimed),
        };

        let required = format.header_len() + ranges.len() * RANGE_ENTRY_SIZE;
        if is_probe || buf.len() < required {
            return QueryReply::new(Status::BUFFER_TOO_SMALL, required as u32);
        }

        write_u32(buf, count_offset, claimed);
        for (i, range) in ranges.iter().enumerate() {
            let offset = format.header_len() + i * RANGE_ENTRY_SIZE;
            write_u64(buf, offset, range.base_frame_number);
            write_u64(buf, offset + 8, range.frame_count);
        }

        QueryReply::new(Status::SUCCESS, required as u32)
    }

    fn query_pfns(&self, buf: &mut [u8]) -> QueryReply {
        let Some(count) = read_u64(buf, 8) else {
            return QueryReply::new(Status::INFO_LENGTH_MISMATCH, 0);
        };
        let required = PFN_REQUEST_HEADER_SIZE + count as usize * IDENTITY_SIZE;
        if buf.len() < required {
            return QueryReply::new(Status::INFO_LENGTH_MISMATCH, required as u32);
        }

        let slots = buf[PFN_REQUEST_HEADER_SIZE..required].chunks_exact_mut(IDENTITY_SIZE);
        for slot in slots {
            let pfn = read_u64(slot, 8).unwrap_or_default();
            if self.failing_frames.contains(&pfn) {
                return QueryReply::new(Status::UNSUCCESSFUL, 0);
            }

            write_u64(slot, 0, u64::MAX);
            write_u64(slot, 8, pfn + self.echo_frame_offset);
            write_u64(slot, 16, self.mappings.get(&pfn).copied().unwrap_or(0));
        }

        QueryReply::new(Status::SUCCESS, required as u32)
    }
}

impl Kernel for SimKernel {
    fn adjust_privilege(
        &mut self,
        privilege: Privilege,
        _enable: bool,
    ) -> std::result::Result<bool, Status> {
        self.adjusted.push(privilege);
        if self.denied_privilege == Some(privilege) {
            Err(Status::PRIVILEGE_NOT_HELD)
        } else {
            Ok(false)
        }
    }

    fn query_superfetch(&mut self, class: SuperfetchInfoClass, buffer: &mut [u8]) -> QueryReply {
        self.calls.push(Call {
            class,
            version: read_u32(buffer, 0).unwrap_or_default(),
            length: buffer.len(),
        });

        match class {
            SuperfetchInfoClass::MemoryRangesQuery => self.query_ranges(buffer),
            SuperfetchInfoClass::PfnQuery => self.query_pfns(buffer),
            _ => QueryReply::new(Status::INVALID_PARAMETER, 0),
        }
    }
}
