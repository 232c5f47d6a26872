//! Virtual-to-physical translation snapshots.

use std::collections::HashMap;

use tracing::info;

use crate::backend::Kernel;
use crate::builder::{SnapshotBuilder, SnapshotConfig};
use crate::error::{Error, Result};
use crate::identity;
use crate::privilege;
use crate::ranges::{self, PhysicalRange};

/// log2 of the page size. Pages are always 4 KiB.
pub const PAGE_SHIFT: u32 = 12;
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;
/// Mask selecting the offset within a page.
pub const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Base address of the page containing `address`.
pub fn page_base(address: u64) -> u64 {
    address & !PAGE_MASK
}

/// Offset of `address` within its page.
pub fn page_offset(address: u64) -> u64 {
    address & PAGE_MASK
}

/// Page aligned virtual address to physical page address.
pub type Translations = HashMap<u64, u64>;

/// A point-in-time map of physical memory and the virtual pages mapped onto
/// it.
///
/// A map is immutable once built. It does not track later changes to the
/// system's mappings; take a new snapshot instead.
#[derive(Debug, Clone, Default)]
pub struct MemoryMap {
    ranges: Vec<PhysicalRange>,
    translations: Translations,
}

impl MemoryMap {
    /// Create a new snapshot builder.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// Take a snapshot through `kernel` with the default configuration.
    ///
    /// Elevates the process privileges first. See [`SnapshotBuilder::snapshot`].
    pub fn snapshot<K: Kernel + ?Sized>(kernel: &mut K) -> Result<Self> {
        Self::builder().snapshot(kernel)
    }

    /// Take a snapshot of the running system.
    #[cfg(target_os = "windows")]
    pub fn current() -> Result<Self> {
        Self::snapshot(&mut crate::backend::nt::NtKernel::new())
    }

    /// Physical memory ranges in the order the kernel reported them.
    pub fn ranges(&self) -> &[PhysicalRange] {
        &self.ranges
    }

    /// Every recorded page translation.
    pub fn translations(&self) -> &Translations {
        &self.translations
    }

    /// Number of translated pages.
    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    /// Total number of physical frames across all ranges.
    pub fn total_frames(&self) -> u64 {
        self.ranges.iter().map(|r| r.frame_count).sum()
    }

    /// Translate a virtual address to a physical address.
    ///
    /// Returns `None` if the containing page has no recorded translation.
    pub fn lookup(&self, address: u64) -> Option<u64> {
        self.translations
            .get(&page_base(address))
            .map(|physical| physical + page_offset(address))
    }

    /// Translate a virtual address to a physical address, returning 0 if the
    /// containing page has no recorded translation.
    pub fn translate(&self, address: u64) -> u64 {
        self.lookup(address).unwrap_or(0)
    }
}

/// Run the full snapshot sequence: elevate, discover, resolve, assemble.
pub(crate) fn take_snapshot<K: Kernel + ?Sized>(
    kernel: &mut K,
    config: &SnapshotConfig,
) -> Result<MemoryMap> {
    if !privilege::elevate(kernel) {
        return Err(Error::ElevationFailed);
    }

    let ranges = ranges::discover(kernel, &config.range_formats);
    if ranges.is_empty() {
        return Err(Error::RangeQueryFailed);
    }

    let mut translations = Translations::new();
    for range in &ranges {
        for (virtual_address, physical_address) in identity::resolve(kernel, range)? {
            translations.insert(page_base(virtual_address), physical_address);
        }
    }

    let map = MemoryMap {
        ranges,
        translations,
    };
    info!(
        ranges = map.ranges.len(),
        frames = map.total_frames(),
        pages = map.len(),
        "memory map snapshot complete"
    );

    Ok(map)
}
