//! Deterministic utilities for reproducible training
//!
//! Provides a seedable RNG, per-stream seed derivation and split
//! tie-breaking so that a fixed seed always yields the same forest, on any
//! platform and regardless of how many threads build it.

use std::cmp::Ordering;

/// SplitMix64 pseudo-random generator.
///
/// Small, fast and fully specified, so sequences never change between
/// releases or platforms.
#[derive(Clone, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next raw 64-bit value
    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(Self::GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `[0, max)`; returns 0 when `max == 0`
    pub fn next_below(&mut self, max: usize) -> usize {
        if max == 0 {
            return 0;
        }
        // Multiply-shift keeps the high bits, which carry the most entropy.
        ((self.next_u64() as u128 * max as u128) >> 64) as usize
    }
}

/// Derive an independent seed for stream `stream` (e.g. a tree index)
pub fn derive_seed(seed: u64, stream: u64) -> u64 {
    const PRIME1: u64 = 0x9E37_79B1_85EB_CA87;
    const PRIME2: u64 = 0xC2B2_AE3D_27D4_EB4F;
    const PRIME3: u64 = 0x1656_67B1_9E37_79F9;

    let mut h = seed.wrapping_add(PRIME3);
    h = h.wrapping_add(stream.wrapping_mul(PRIME1));
    h = h.rotate_left(31).wrapping_mul(PRIME2);

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Deterministic hash of a row position, used to order dataset rows
pub fn row_hash(index: usize, seed: u64) -> u64 {
    derive_seed(seed, index as u64)
}

/// Ordering key used when two split candidates have equal gain.
///
/// Lower feature index wins, then lower threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: f64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: f64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }

    pub fn cmp_key(&self, other: &Self) -> Ordering {
        self.feature_idx
            .cmp(&other.feature_idx)
            .then_with(|| self.threshold.total_cmp(&other.threshold))
    }
}
