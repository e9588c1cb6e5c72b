//! In-memory Bloom filter: sizing, add/check, reset, merge, dump.
use crate::consts::{FORMAT_MAJOR, FORMAT_MINOR, MAX_BITS};
use crate::errors::{BloomError, Result};
use crate::hash::Probes;
use crate::params::{BloomConfig, FilterParams};
use crate::utils::try_zeroed;
use std::fmt;
use std::io::{self, Write};
use tracing::{debug, warn};

/// Classic insert/query Bloom filter over byte keys.
///
/// The bit array is always a whole number of bytes (`bits == bytes * 8`);
/// bit `i` lives in byte `i / 8` under mask `1 << (i % 8)`.
#[derive(Clone, PartialEq)]
pub struct BloomFilter {
    entries: u64,
    error: f64,
    bits: u64,
    hashes: u32,
    bit_array: Vec<u8>,
}

impl BloomFilter {
    /// Filter sized for `entries` items at false-positive rate `error`.
    pub fn new(entries: u64, error: f64) -> Result<Self> {
        Self::from_params(FilterParams::derive(entries, error)?)
    }

    /// Filter with explicit dimensions. `bits` is rounded up to whole bytes.
    pub fn with_size(bits: u64, hashes: u32) -> Result<Self> {
        Self::from_params(FilterParams::explicit(bits, hashes)?)
    }

    pub fn from_config(cfg: &BloomConfig) -> Result<Self> {
        Self::from_params(cfg.params()?)
    }

    pub(crate) fn from_params(p: FilterParams) -> Result<Self> {
        let bit_array = alloc_bits(p.bits)?;
        debug!(entries = p.entries, error = p.error, bits = p.bits, hashes = p.hashes, "bloom filter allocated");
        Ok(Self { entries: p.entries, error: p.error, bits: p.bits, hashes: p.hashes, bit_array })
    }

    /// Caller guarantees `bit_array.len() * 8 == p.bits`.
    pub(crate) fn from_parts(p: FilterParams, bit_array: Vec<u8>) -> Self {
        debug_assert_eq!(bit_array.len() as u64 * 8, p.bits);
        Self { entries: p.entries, error: p.error, bits: p.bits, hashes: p.hashes, bit_array }
    }

    #[inline]
    fn probes(&self, key: &[u8]) -> Probes { Probes::new(key, self.bits, self.hashes) }

    /// Sets the key's bits. Returns true iff every one of them was already set,
    /// i.e. the key (or a colliding combination) was present before the call.
    pub fn add(&mut self, key: &[u8]) -> bool {
        let mut hits = 0u32;
        for bit in self.probes(key) {
            let (idx, mask) = locate(bit);
            let byte = &mut self.bit_array[idx];
            if *byte & mask != 0 {
                hits += 1;
            } else {
                *byte |= mask;
            }
        }
        hits == self.hashes
    }

    /// True iff every probed bit is set. Never false for an added key.
    pub fn check(&self, key: &[u8]) -> bool {
        self.probes(key).all(|bit| {
            let (idx, mask) = locate(bit);
            self.bit_array[idx] & mask != 0
        })
    }

    /// Clears all bits; dimensions are kept.
    ///
    /// Returns `()` where the binding contract reports a `bool`: the buffer is
    /// owned, so there is no failure to report and bindings can answer `true`.
    pub fn reset(&mut self) {
        self.bit_array.fill(0);
    }

    /// Same bit count and probe count, so both filters map keys identically.
    pub fn is_compatible(&self, other: &BloomFilter) -> bool {
        self.bits == other.bits && self.hashes == other.hashes
    }

    /// ORs `other` into `self`. Incompatible dimensions are rejected and
    /// leave `self` untouched.
    pub fn merge(&mut self, other: &BloomFilter) -> Result<()> {
        if !self.is_compatible(other) {
            warn!(
                self_bits = self.bits, other_bits = other.bits,
                self_hashes = self.hashes, other_hashes = other.hashes,
                "refusing to merge incompatible bloom filters"
            );
            return Err(BloomError::IncompatibleFilters {
                self_bits: self.bits,
                other_bits: other.bits,
                self_hashes: self.hashes,
                other_hashes: other.hashes,
            });
        }
        for (s, o) in self.bit_array.iter_mut().zip(other.bit_array.iter()) {
            *s |= *o;
        }
        Ok(())
    }

    pub fn entries(&self) -> u64 { self.entries }
    pub fn error(&self) -> f64 { self.error }
    pub fn bits(&self) -> u64 { self.bits }
    pub fn bytes(&self) -> u64 { self.bit_array.len() as u64 }
    pub fn hashes(&self) -> u32 { self.hashes }

    /// Raw bit array.
    pub fn as_bytes(&self) -> &[u8] { &self.bit_array }

    pub fn params(&self) -> FilterParams {
        FilterParams {
            entries: self.entries,
            error: self.error,
            bits: self.bits,
            bytes: self.bytes(),
            hashes: self.hashes,
        }
    }

    pub fn count_ones(&self) -> u64 {
        self.bit_array.iter().map(|b| b.count_ones() as u64).sum()
    }

    pub fn is_empty(&self) -> bool { self.bit_array.iter().all(|&b| b == 0) }

    /// Fraction of bits set.
    pub fn fill_ratio(&self) -> f64 {
        if self.bits == 0 { 0.0 } else { self.count_ones() as f64 / self.bits as f64 }
    }

    /// Chance that a key never added passes `check`, given the current fill.
    pub fn estimated_fpr(&self) -> f64 { self.fill_ratio().powi(self.hashes as i32) }

    /// Writes the diagnostic rendering to stderr.
    pub fn dump(&self) {
        let stderr = io::stderr();
        let mut lock = stderr.lock();
        let _ = self.dump_to(&mut lock);
    }

    pub fn dump_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write!(w, "{self}")
    }
}

#[inline]
fn locate(bit: u64) -> (usize, u8) {
    ((bit / 8) as usize, 1u8 << (bit % 8))
}

pub(crate) fn alloc_bits(bits: u64) -> Result<Vec<u8>> {
    let exceeded = BloomError::CapacityExceeded { bits: bits as u128, max: MAX_BITS };
    match usize::try_from(bits / 8) {
        Ok(bytes) => try_zeroed(bytes).ok_or(exceeded),
        Err(_) => Err(exceeded),
    }
}

impl fmt::Display for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.bytes();
        writeln!(f, "bloom filter (format {FORMAT_MAJOR}.{FORMAT_MINOR})")?;
        writeln!(f, " ->entries = {}", self.entries)?;
        writeln!(f, " ->error = {:.6}", self.error)?;
        writeln!(f, " ->bits = {}", self.bits)?;
        writeln!(f, " ->bits per elem = {:.6}", self.params().bits_per_entry())?;
        writeln!(f, " ->bytes = {} ({} KiB / {} MiB)", bytes, bytes / 1024, bytes / (1024 * 1024))?;
        writeln!(f, " ->hash functions = {}", self.hashes)?;
        writeln!(f, " ->bits set = {} (fill {:.6})", self.count_ones(), self.fill_ratio())?;
        writeln!(f, " ->estimated fpr = {:.6}", self.estimated_fpr())
    }
}

impl fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomFilter")
            .field("entries", &self.entries)
            .field("error", &self.error)
            .field("bits", &self.bits)
            .field("bytes", &self.bytes())
            .field("hashes", &self.hashes)
            .field("bits_set", &self.count_ones())
            .finish()
    }
}
