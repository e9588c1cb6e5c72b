//! Sizing math.
//!
//!   bits   = ceil(-n * ln(p) / ln(2)^2), rounded up to whole bytes
//!   hashes = round(bits / n * ln(2)), at least 1
//!   fpr    = (1 - e^(-k*n/m))^k

use crate::consts::{DEFAULT_ENTRIES, DEFAULT_ERROR, MAX_BITS, MAX_HASHES};
use crate::errors::{BloomError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::LN_2;

/// Requested capacity and accuracy. `Default` is 1000 entries at 1%.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BloomConfig {
    pub entries: u64,
    pub error: f64,
}

impl Default for BloomConfig {
    fn default() -> Self {
        Self { entries: DEFAULT_ENTRIES, error: DEFAULT_ERROR }
    }
}

impl BloomConfig {
    pub fn new(entries: u64, error: f64) -> Self { Self { entries, error } }

    pub fn validate(&self) -> Result<()> { validate_accuracy(self.entries, self.error) }

    pub fn params(&self) -> Result<FilterParams> { FilterParams::derive(self.entries, self.error) }
}

/// Dimensions of a filter. Two filters with equal `bits` and `hashes` probe
/// identical positions for every key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    pub entries: u64,
    pub error: f64,
    pub bits: u64,
    pub bytes: u64,
    pub hashes: u32,
}

impl FilterParams {
    /// Optimal dimensions for `entries` items at false-positive rate `error`.
    pub fn derive(entries: u64, error: f64) -> Result<Self> {
        let bits = optimal_bits(entries, error)?;
        let hashes = optimal_hashes(bits, entries);
        Ok(Self { entries, error, bits, bytes: bits / 8, hashes })
    }

    /// Explicit dimensions. `entries` and `error` are back-derived so the
    /// filter still reports a meaningful capacity.
    pub fn explicit(bits: u64, hashes: u32) -> Result<Self> {
        if bits == 0 {
            return Err(BloomError::InvalidParameters("bits must be at least 1".into()));
        }
        if hashes == 0 || hashes > MAX_HASHES {
            return Err(BloomError::InvalidParameters(format!(
                "hashes must be in 1..={MAX_HASHES}, got {hashes}"
            )));
        }
        let bits = round_to_bytes(bits)?;
        let entries = ((bits as f64 * LN_2) / hashes as f64).round().max(1.0) as u64;
        let error = false_positive_rate(bits, entries, hashes)
            .clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON);
        Ok(Self { entries, error, bits, bytes: bits / 8, hashes })
    }

    pub fn bits_per_entry(&self) -> f64 { self.bits as f64 / self.entries.max(1) as f64 }
}

pub fn validate_accuracy(entries: u64, error: f64) -> Result<()> {
    if entries == 0 {
        return Err(BloomError::InvalidParameters("entries must be at least 1".into()));
    }
    if !error.is_finite() || error <= 0.0 || error >= 1.0 {
        return Err(BloomError::InvalidParameters(format!(
            "error must be in the open interval (0, 1), got {error}"
        )));
    }
    Ok(())
}

/// Bit count for `entries` items at rate `error`, a multiple of 8.
pub fn optimal_bits(entries: u64, error: f64) -> Result<u64> {
    validate_accuracy(entries, error)?;
    let raw = (-(entries as f64) * error.ln() / (LN_2 * LN_2)).ceil();
    if !raw.is_finite() || raw > MAX_BITS as f64 {
        return Err(BloomError::CapacityExceeded { bits: raw as u128, max: MAX_BITS });
    }
    round_to_bytes((raw as u64).max(1))
}

/// Probe count for a `bits`-wide filter holding `entries` items.
pub fn optimal_hashes(bits: u64, entries: u64) -> u32 {
    if entries == 0 {
        return 1;
    }
    let k = ((bits as f64 / entries as f64) * LN_2).round();
    k.clamp(1.0, MAX_HASHES as f64) as u32
}

/// Expected false-positive rate after `items` insertions.
pub fn false_positive_rate(bits: u64, items: u64, hashes: u32) -> f64 {
    if bits == 0 {
        return 1.0;
    }
    let exponent = -(hashes as f64) * (items as f64) / (bits as f64);
    (1.0 - exponent.exp()).powi(hashes as i32)
}

/// Rounds up to a whole number of bytes, enforcing `MAX_BITS`.
pub fn round_to_bytes(bits: u64) -> Result<u64> {
    if bits > MAX_BITS {
        return Err(BloomError::CapacityExceeded { bits: bits as u128, max: MAX_BITS });
    }
    Ok(bits.div_ceil(8) * 8)
}
