use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use bloom_core::{
    consts::{DEFAULT_ENTRIES, DEFAULT_ERROR},
    BloomConfig, BloomFilter,
};

#[derive(Parser)]
#[command(name = "bloom", version, about = "Bloom filter images — create, add, check, merge")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct KeyArgs {
    #[arg(long)]
    file: PathBuf,
    /// Keys to add or check
    #[arg(required = true)]
    keys: Vec<String>,
    /// Keys are hex-encoded bytes
    #[arg(long, default_value_t = false)]
    hex: bool,
}

#[derive(Subcommand)]
enum Cmd {
    Create {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = DEFAULT_ENTRIES, conflicts_with_all = ["bits", "config"])]
        entries: u64,
        #[arg(long, default_value_t = DEFAULT_ERROR, conflicts_with_all = ["bits", "config"])]
        error: f64,
        /// Explicit bit count (rounded up to whole bytes)
        #[arg(long, requires = "hashes", conflicts_with = "config")]
        bits: Option<u64>,
        #[arg(long, requires = "bits")]
        hashes: Option<u32>,
        /// JSON file with {"entries": N, "error": E}
        #[arg(long)]
        config: Option<PathBuf>,
        /// Overwrite an existing image
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    Add(KeyArgs),

    Check(KeyArgs),

    Merge {
        #[arg(long)]
        file: PathBuf,
        /// Image ORed into --file
        #[arg(long)]
        other: PathBuf,
    },

    Reset {
        #[arg(long)]
        file: PathBuf,
    },

    Info {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    Dump {
        #[arg(long)]
        file: PathBuf,
    },

    Version,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open(path: &Path) -> Result<BloomFilter> {
    BloomFilter::load(path).with_context(|| format!("loading {}", path.display()))
}

fn store(filter: &BloomFilter, path: &Path) -> Result<()> {
    filter.save(path).with_context(|| format!("saving {}", path.display()))
}

fn decode_keys(args: &KeyArgs) -> Result<Vec<Vec<u8>>> {
    args.keys
        .iter()
        .map(|k| {
            if args.hex {
                hex::decode(k).map_err(|e| anyhow!("key {k:?}: {e}"))
            } else {
                Ok(k.as_bytes().to_vec())
            }
        })
        .collect()
}

fn read_config(path: &Path) -> Result<BloomConfig> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: BloomConfig = serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Create { file, entries, error, bits, hashes, config, force } => {
            if file.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", file.display());
            }
            let filter = match (bits, hashes, config) {
                (Some(b), Some(k), _) => BloomFilter::with_size(b, k)?,
                (_, _, Some(cfg)) => BloomFilter::from_config(&read_config(&cfg)?)?,
                _ => BloomFilter::new(entries, error)?,
            };
            debug!(file = %file.display(), bits = filter.bits(), hashes = filter.hashes(), "creating image");
            store(&filter, &file)?;
            println!(
                "created: {} entries={} error={} bits={} bytes={} hashes={}",
                file.display(),
                filter.entries(),
                filter.error(),
                filter.bits(),
                filter.bytes(),
                filter.hashes()
            );
        }
        Cmd::Add(args) => {
            let keys = decode_keys(&args)?;
            let mut filter = open(&args.file)?;
            debug!(file = %args.file.display(), keys = keys.len(), "adding keys");
            for (raw, key) in args.keys.iter().zip(&keys) {
                let seen = filter.add(key);
                println!("{raw}: {}", if seen { "present" } else { "added" });
            }
            store(&filter, &args.file)?;
        }
        Cmd::Check(args) => {
            let keys = decode_keys(&args)?;
            let filter = open(&args.file)?;
            debug!(file = %args.file.display(), keys = keys.len(), "checking keys");
            for (raw, key) in args.keys.iter().zip(&keys) {
                println!("{raw}: {}", if filter.check(key) { "yes" } else { "no" });
            }
        }
        Cmd::Merge { file, other } => {
            let mut filter = open(&file)?;
            let rhs = open(&other)?;
            debug!(file = %file.display(), other = %other.display(), "merging images");
            filter
                .merge(&rhs)
                .with_context(|| format!("merging {} into {}", other.display(), file.display()))?;
            store(&filter, &file)?;
            println!("merged: {} <- {} (bits set={})", file.display(), other.display(), filter.count_ones());
        }
        Cmd::Reset { file } => {
            let mut filter = open(&file)?;
            debug!(file = %file.display(), bits_set = filter.count_ones(), "resetting image");
            filter.reset();
            store(&filter, &file)?;
            println!("reset: {}", file.display());
        }
        Cmd::Info { file, json } => {
            let filter = open(&file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&filter.params())?);
            } else {
                let p = filter.params();
                println!("entries : {}", p.entries);
                println!("error   : {}", p.error);
                println!("bits    : {}", p.bits);
                println!("bytes   : {}", p.bytes);
                println!("hashes  : {}", p.hashes);
                println!("fill    : {:.4} (est. fpr {:.6})", filter.fill_ratio(), filter.estimated_fpr());
            }
        }
        Cmd::Dump { file } => {
            open(&file)?.dump();
        }
        Cmd::Version => {
            println!("bloom {}", bloom_core::version());
        }
    }
    Ok(())
}
