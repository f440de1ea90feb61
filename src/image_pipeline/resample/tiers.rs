use crate::image_pipeline::common::error::{CompositeError, Result};

/// Replication factors the resampler accepts between a band's native side
/// length and the output side length.
///
/// The defaults follow the fixed grids of the source imagery: 10980, 5490 and
/// 1830 pixels relate by factors 2, 3 and 6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionTiers {
    ratios: Vec<usize>,
}

/// Identity plus the factors between the 10 m, 20 m and 60 m grids.
const DEFAULT_RATIOS: [usize; 4] = [1, 2, 3, 6];

impl Default for ResolutionTiers {
    fn default() -> Self {
        Self {
            ratios: DEFAULT_RATIOS.to_vec(),
        }
    }
}

impl ResolutionTiers {
    /// Builds a table from `ratios`. Identity is always included and zero is ignored.
    pub fn new(ratios: impl IntoIterator<Item = usize>) -> Self {
        let mut ratios: Vec<usize> = ratios.into_iter().filter(|&r| r > 0).collect();
        ratios.push(1);
        ratios.sort_unstable();
        ratios.dedup();
        Self { ratios }
    }

    pub fn ratios(&self) -> &[usize] {
        &self.ratios
    }

    pub fn supports(&self, ratio: usize) -> bool {
        self.ratios.binary_search(&ratio).is_ok()
    }

    /// Replication factor taking `native` to `target`.
    ///
    /// Fails for downsampling, non-integer relations, and factors outside the table.
    pub fn ratio(&self, native: usize, target: usize) -> Result<usize> {
        let unsupported = || CompositeError::UnsupportedResolutionRatio { native, target };

        if native == 0 || native > target || target % native != 0 {
            return Err(unsupported());
        }

        let ratio = target / native;
        if self.supports(ratio) {
            Ok(ratio)
        } else {
            Err(unsupported())
        }
    }
}
