//! Deterministic utilities for reproducible training
//!
//! Provides LCG-based RNG, deterministic hashing, fixed-point conversion
//! and tie-breaking logic so identical datasets always yield identical models.

use std::num::Wrapping;

/// Fixed-point scale used for every feature, target and leaf value (1e6)
pub const SCALE: i64 = 1_000_000;

/// Convert a float to fixed-point at [`SCALE`].
///
/// Rounds to nearest. Out-of-range values saturate and NaN maps to zero,
/// which is the behaviour of Rust's float-to-int casts.
pub fn to_fixed(value: f64) -> i64 {
    (value * SCALE as f64).round() as i64
}

/// Convert a fixed-point value at [`SCALE`] back to a float
pub fn from_fixed(value: i64) -> f64 {
    value as f64 / SCALE as f64
}

/// Seeded LCG driving row subsampling; glibc constants, 31-bit state
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        Self {
            state: Wrapping(seed.wrapping_abs() % Self::MODULUS),
        }
    }

    /// Next raw value in [0, 2^31)
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        self.state.0 & (Self::MODULUS - 1)
    }

    /// Generate random value in range [0, max)
    ///
    /// Maps through the high bits; the low bits of an LCG cycle with a short period.
    pub fn next_range(&mut self, max: i64) -> i64 {
        if max <= 0 {
            return 0;
        }
        ((self.next_i64() as i128 * max as i128) >> 31) as i64
    }

    /// Random value in [0, 1_000_000) representing 0.0 to 1.0
    pub fn next_unit_micro(&mut self) -> i64 {
        let r = self.next_i64();
        (r * 1_000_000) / Self::MODULUS
    }
}

/// Seeded xxhash64-style mix over a row of fixed-point values; used as the shuffle sort key
pub fn xxhash64_i64(data: &[i64], seed: i64) -> i64 {
    const PRIME1: i64 = 0x9E3779B185EBCA87_u64 as i64;
    const PRIME2: i64 = 0xC2B2AE3D27D4EB4F_u64 as i64;
    const PRIME3: i64 = 0x165667B19E3779F9_u64 as i64;
    const PRIME5: i64 = 0x85EBCA77C2B2AE63_u64 as i64;

    let mut h = seed.wrapping_add(PRIME5);

    for &val in data {
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Ordering key for equal-gain split candidates: lowest feature, then lowest threshold, then node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
    pub node_id: usize,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64, node_id: usize) -> Self {
        Self {
            feature_idx,
            threshold,
            node_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_i64(), rng2.next_i64());
        }
    }

    #[test]
    fn test_lcg_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..1000 {
            let val = rng.next_range(10);
            assert!((0..10).contains(&val));
        }
    }

    #[test]
    fn test_lcg_range_covers_small_domain() {
        let mut rng = LcgRng::new(7);
        let mut seen = [false; 3];
        for _ in 0..300 {
            seen[rng.next_range(3) as usize] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_unit_micro_bounds() {
        let mut rng = LcgRng::new(-5);
        for _ in 0..100 {
            let val = rng.next_unit_micro();
            assert!((0..1_000_000).contains(&val));
        }
    }

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(to_fixed(4.0), 4 * SCALE);
        assert_eq!(to_fixed(-18.0), -18 * SCALE);
        assert_eq!(to_fixed(6.25), 6_250_000);
        assert_eq!(to_fixed(f64::NAN), 0);
        assert_eq!(from_fixed(7_500_000), 7.5);
    }

    #[test]
    fn test_row_hash_depends_on_seed() {
        let row = [4 * SCALE, 6 * SCALE, 1];
        assert_eq!(xxhash64_i64(&row, 42), xxhash64_i64(&row, 42));
        assert_ne!(xxhash64_i64(&row, 42), xxhash64_i64(&row, 43));
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 100, 0);
        let t2 = SplitTieBreaker::new(0, 100, 1);
        let t3 = SplitTieBreaker::new(1, 50, 0);

        assert!(t1 < t2);
        assert!(t1 < t3);
    }
}
