//! Bloom prefilter over indexed digests.
//!
//! A "definitely absent" answer lets the resolver skip the authoritative
//! lookup. The filter never produces false negatives: every digest that was
//! added answers `true`. False positives only cost an extra lookup.

use growable_bloom_filter::GrowableBloom;

use crate::scanner::ContentDigest;

/// Default target false positive rate (1%).
pub const DEFAULT_FP_RATE: f64 = 0.01;

/// Probabilistic set of digests known to the index.
#[derive(Debug, Clone)]
pub struct BloomPrefilter {
    bloom: GrowableBloom,
    fp_rate: f64,
    capacity: usize,
}

impl BloomPrefilter {
    /// Create an empty filter sized for `capacity` digests at `fp_rate`.
    ///
    /// The rate is clamped to `0.0001..=0.1`. Inserting more than
    /// `capacity` digests grows the filter instead of degrading it.
    #[must_use]
    pub fn new(capacity: usize, fp_rate: f64) -> Self {
        let fp_rate = fp_rate.clamp(0.0001, 0.1);
        let capacity = capacity.max(1);
        Self {
            bloom: GrowableBloom::new(fp_rate, capacity),
            fp_rate,
            capacity,
        }
    }

    /// Build a filter seeded with `digests`.
    ///
    /// `expected_new` is the number of additional digests the run may add
    /// (typically the number of files about to be scanned).
    pub fn from_digests<'a, I>(digests: I, expected_new: usize, fp_rate: f64) -> Self
    where
        I: IntoIterator<Item = &'a ContentDigest>,
        I::IntoIter: ExactSizeIterator,
    {
        let digests = digests.into_iter();
        let mut filter = Self::new(digests.len().saturating_add(expected_new), fp_rate);
        for digest in digests {
            filter.add(digest);
        }
        filter
    }

    /// Whether `digest` may be present. `false` means definitely absent.
    #[must_use]
    pub fn might_contain(&self, digest: &ContentDigest) -> bool {
        self.bloom.contains(digest)
    }

    /// Record `digest` as present.
    pub fn add(&mut self, digest: &ContentDigest) {
        self.bloom.insert(digest);
    }

    /// Number of digests inserted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bloom.len()
    }

    /// Whether nothing has been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bloom.is_empty()
    }

    /// Target false positive rate.
    #[must_use]
    pub fn fp_rate(&self) -> f64 {
        self.fp_rate
    }

    /// Initial sizing capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
