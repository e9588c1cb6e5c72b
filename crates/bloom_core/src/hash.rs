//! Probe positions.
//!
//! Two base hashes per key, combined by double hashing:
//!
//!   h1 = xxh3_64(key, seed = HASH_SEED)
//!   h2 = xxh3_64(key, seed = h1) | 1
//!   index_i = (h1 + i * h2) mod bits,   i in 0..hashes
//!
//! The sum is taken in 128-bit arithmetic so it never wraps. `h2` is forced
//! odd so it is never zero. This scheme is part of the image format: a filter
//! loaded from disk must probe the same positions as the one that saved it.

use crate::consts::HASH_SEED;
use xxhash_rust::xxh3::xxh3_64_with_seed;

#[inline]
pub fn base_hashes(key: &[u8]) -> (u64, u64) {
    let h1 = xxh3_64_with_seed(key, HASH_SEED);
    let h2 = xxh3_64_with_seed(key, h1) | 1;
    (h1, h2)
}

/// Iterator over the `hashes` bit indices of one key. Does not allocate.
#[derive(Debug, Clone)]
pub struct Probes {
    h1: u128,
    h2: u128,
    bits: u128,
    i: u32,
    hashes: u32,
}

impl Probes {
    pub fn new(key: &[u8], bits: u64, hashes: u32) -> Self {
        let (h1, h2) = base_hashes(key);
        Self { h1: h1 as u128, h2: h2 as u128, bits: bits as u128, i: 0, hashes }
    }
}

impl Iterator for Probes {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        if self.i >= self.hashes || self.bits == 0 {
            return None;
        }
        let idx = (self.h1 + self.i as u128 * self.h2) % self.bits;
        self.i += 1;
        Some(idx as u64)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.bits == 0 { 0 } else { (self.hashes - self.i) as usize };
        (left, Some(left))
    }
}

impl ExactSizeIterator for Probes {}
