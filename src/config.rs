//! Configuration of the real-number unique table.

use crate::types::Tolerance;

/// Parameters fixed when a [`RealTable`][crate::table::RealTable] is created.
///
/// # Example
///
/// ```
/// use qdd_rs::config::Config;
/// use qdd_rs::types::Tolerance;
///
/// let config = Config::default()
///     .with_tolerance(Tolerance::new(1e-10).unwrap())
///     .with_bucket_bits(12);
/// assert_eq!(config.bucket_bits, 12);
/// ```
#[derive(Debug, Copy, Clone)]
pub struct Config {
    /// Canonicalization tolerance.
    pub tolerance: Tolerance,
    /// Number of hash buckets is `2^bucket_bits`.
    pub bucket_bits: usize,
    /// Number of live entries that triggers a collection on the next allocation.
    pub gc_limit: usize,
}

impl Config {
    pub const DEFAULT_BUCKET_BITS: usize = 16;
    pub const DEFAULT_GC_LIMIT: usize = 1 << 16;

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// # Panics
    ///
    /// Panics if `bits > 31`.
    pub fn with_bucket_bits(mut self, bits: usize) -> Self {
        assert!(bits <= 31, "Bucket bits should be in the range 0..=31");
        self.bucket_bits = bits;
        self
    }

    pub fn with_gc_limit(mut self, limit: usize) -> Self {
        self.gc_limit = limit;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            bucket_bits: Self::DEFAULT_BUCKET_BITS,
            gc_limit: Self::DEFAULT_GC_LIMIT,
        }
    }
}
