// crates/bloom_core/src/consts.rs

pub const MAGIC_IMG: &[u8; 4] = b"BLMF";
pub const FORMAT_MAJOR: u16 = 2;
pub const FORMAT_MINOR: u16 = 1;

pub const HDR_SIZE: usize = 48;

pub const DEFAULT_ENTRIES: u64 = 1000;
pub const DEFAULT_ERROR: f64 = 0.01;

/// Upper bound on the bit array (16 GiB of storage). Sizes above it fail
/// with `CapacityExceeded` before any allocation. Below it, only an outright
/// allocator refusal is reported; memory the kernel overcommits and later
/// cannot back is not (see `utils::try_zeroed`).
pub const MAX_BITS: u64 = 1 << 37;

/// Probes per operation accepted from callers and images.
pub const MAX_HASHES: u32 = u16::MAX as u32;

/// Seed of the first base hash. Changing it changes every probe position,
/// so it is part of the on-disk format.
pub const HASH_SEED: u64 = 0x9747_b28c;

const _: () = {
    assert!(HDR_SIZE == 4 + 2 + 2 + 8 + 8 + 8 + 8 + 4 + 4);
    assert!(MAX_BITS % 8 == 0);
};
