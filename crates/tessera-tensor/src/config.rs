/// Tuning knobs for element-wise algebra.
///
/// The config is carried by every tensor and inherited by tensors derived
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgebraConfig {
    /// Minimum number of driving entries for which algebra runs on the rayon pool.
    pub parallel_threshold: usize,
}

impl AlgebraConfig {
    /// Default value of [`AlgebraConfig::parallel_threshold`].
    pub const DEFAULT_PARALLEL_THRESHOLD: usize = 1000;

    /// Config that never goes parallel.
    pub fn sequential() -> Self {
        Self {
            parallel_threshold: usize::MAX,
        }
    }

    /// Config with a custom parallel threshold.
    pub fn with_parallel_threshold(parallel_threshold: usize) -> Self {
        Self { parallel_threshold }
    }

    /// Returns true when `len` driving entries should be processed in parallel.
    #[inline]
    pub fn use_parallel(&self, len: usize) -> bool {
        len >= self.parallel_threshold
    }
}

impl Default for AlgebraConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: Self::DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}
