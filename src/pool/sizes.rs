//! Pool sizing by scale factor.

/// Default minimum idle renderers per scale factor (1x, 2x, 3x).
pub const DEFAULT_MIN_POOL_SIZES: [usize; 3] = [8, 4, 2];

/// Default maximum renderers per scale factor (1x, 2x, 3x).
pub const DEFAULT_MAX_POOL_SIZES: [usize; 3] = [16, 8, 4];

/// Default largest scale factor served.
pub const DEFAULT_MAX_SCALE_FACTOR: u8 = 3;

/// Hard upper bound on the scale factor.
pub const MAX_SCALE_FACTOR_LIMIT: u8 = 9;

/// Minimum/maximum pool sizes indexed by scale factor.
///
/// Scale factor `s` uses entry `s - 1`; scale factors beyond the end of a list
/// reuse its last entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSizes {
    min: Vec<usize>,
    max: Vec<usize>,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_POOL_SIZES.to_vec(),
            max: DEFAULT_MAX_POOL_SIZES.to_vec(),
        }
    }
}

impl PoolSizes {
    /// Build from configured lists; empty lists fall back to the defaults.
    pub fn new(min: Vec<usize>, max: Vec<usize>) -> Self {
        let defaults = Self::default();
        Self {
            min: if min.is_empty() { defaults.min } else { min },
            max: if max.is_empty() { defaults.max } else { max },
        }
    }

    /// `(min, max)` for a scale factor. `max` is never below `min` or 1.
    pub fn for_scale(&self, scale: u8) -> (usize, usize) {
        let pick = |list: &[usize]| {
            let index = (scale.max(1) as usize - 1).min(list.len().saturating_sub(1));
            list.get(index).copied().unwrap_or(0)
        };
        let min = pick(&self.min);
        let max = pick(&self.max).max(min).max(1);
        (min, max)
    }
}
