pub mod consts;
pub mod errors;
pub mod utils;
pub mod params;
pub mod hash;
pub mod filter;
pub mod image;

pub use errors::{BloomError, Result};
pub use filter::BloomFilter;
pub use params::{BloomConfig, FilterParams};

/// Engine version, reported by bindings and the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str { VERSION }
