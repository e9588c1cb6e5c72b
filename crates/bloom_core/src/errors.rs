use thiserror::Error;

#[derive(Debug, Error)]
pub enum BloomError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("capacity exceeded: {bits} bits requested (max {max})")]
    CapacityExceeded { bits: u128, max: u64 },

    #[error("incompatible filters: bits {self_bits} vs {other_bits}, hashes {self_hashes} vs {other_hashes}")]
    IncompatibleFilters {
        self_bits: u64,
        other_bits: u64,
        self_hashes: u32,
        other_hashes: u32,
    },

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt image: {0}")]
    CorruptImage(String),
}

impl From<tempfile::PersistError> for BloomError {
    fn from(e: tempfile::PersistError) -> Self {
        BloomError::Io(e.error)
    }
}

pub type Result<T> = std::result::Result<T, BloomError>;
