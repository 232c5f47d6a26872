//! Snapshot builder for configuring and taking memory map snapshots.

use crate::backend::Kernel;
use crate::error::Result;
use crate::map::{self, MemoryMap};
use crate::ranges::RangeFormat;

/// Settings used for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    /// Range reply formats, tried in order until one yields ranges.
    pub range_formats: Vec<RangeFormat>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            range_formats: RangeFormat::ALL.to_vec(),
        }
    }
}

/// Builder for taking a [`MemoryMap`] snapshot.
///
/// # Example
///
/// ```rust,no_run
/// # #[cfg(target_os = "windows")]
/// # fn main() -> superfetch::Result<()> {
/// use superfetch::{MemoryMap, RangeFormat};
/// use superfetch::backend::nt::NtKernel;
///
/// let map = MemoryMap::builder()
///     .range_formats([RangeFormat::V2, RangeFormat::V1])
///     .snapshot(&mut NtKernel::new())?;
///
/// let value = 0u64;
/// let physical = map.translate(&value as *const u64 as u64);
/// # let _ = physical;
/// # Ok(())
/// # }
/// # #[cfg(not(target_os = "windows"))]
/// # fn main() {}
/// ```
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    range_formats: Option<Vec<RangeFormat>>,
}

impl SnapshotBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the range formats to try, in order.
    ///
    /// Default: [`RangeFormat::V1`], then [`RangeFormat::V2`]
    pub fn range_formats(mut self, formats: impl IntoIterator<Item = RangeFormat>) -> Self {
        self.range_formats = Some(formats.into_iter().collect());
        self
    }

    /// Resolve the final configuration.
    pub fn config(&self) -> SnapshotConfig {
        SnapshotConfig {
            range_formats: self
                .range_formats
                .clone()
                .unwrap_or_else(|| RangeFormat::ALL.to_vec()),
        }
    }

    /// Take the snapshot.
    ///
    /// Enables the profiling and debug privileges for the rest of the
    /// process lifetime, discovers the physical ranges and resolves every
    /// frame in them. Any failure aborts the whole snapshot.
    pub fn snapshot<K: Kernel + ?Sized>(self, kernel: &mut K) -> Result<MemoryMap> {
        map::take_snapshot(kernel, &self.config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::sim::{RangeReply, SimKernel};
    use crate::backend::SuperfetchInfoClass;
    use crate::error::Error;
    use crate::ranges::PhysicalRange;

    #[test]
    fn test_default_config() {
        assert_eq!(
            SnapshotBuilder::new().config().range_formats,
            vec![RangeFormat::V1, RangeFormat::V2]
        );
        assert_eq!(SnapshotBuilder::new().config(), SnapshotConfig::default());
    }

    #[test]
    fn test_single_format() {
        let mut kernel = SimKernel::new();
        kernel.v2 = RangeReply::Ranges(vec![PhysicalRange::new(0x10, 1)]);
        kernel.mappings.insert(0x10, 0x5000);

        let map = MemoryMap::builder()
            .range_formats([RangeFormat::V2])
            .snapshot(&mut kernel)
            .unwrap();

        assert_eq!(map.translate(0x5004), 0x10_004);
        assert!(kernel
            .calls
            .iter()
            .filter(|c| c.class == SuperfetchInfoClass::MemoryRangesQuery)
            .all(|c| c.version == 2));
    }

    #[test]
    fn test_no_formats_fails() {
        let mut kernel = SimKernel::new();
        kernel.v1 = RangeReply::Ranges(vec![PhysicalRange::new(0x10, 1)]);

        let err = MemoryMap::builder()
            .range_formats([])
            .snapshot(&mut kernel)
            .unwrap_err();
        assert_eq!(err, Error::RangeQueryFailed);
    }
}
