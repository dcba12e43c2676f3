//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use hostfetch_core::{DEFAULT_PER_HOST_LIMIT, DuplicatePolicy};

/// Default poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Fetch a batch of URLs with a per-host concurrency ceiling.
///
/// Each distinct URL is fetched once and saved as `url_<idx>.html` in the
/// output directory; repeated URLs report the first occurrence's file.
#[derive(Parser, Debug, Clone)]
#[command(name = "hostfetch")]
#[command(author, version, about)]
pub struct Args {
    /// URLs to fetch (used when --file is not given)
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// File with one URL per line ("-" reads stdin)
    #[arg(short = 'f', long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Directory for fetched files
    #[arg(short = 'o', long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum concurrent fetches per host (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_PER_HOST_LIMIT as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub per_host_limit: u8,

    /// Admission re-scan interval in milliseconds (10-60000)
    #[arg(short = 'p', long, default_value_t = DEFAULT_POLL_INTERVAL_MS, value_parser = clap::value_parser!(u64).range(10..=60000))]
    pub poll_interval: u64,

    /// Re-scan only on the poll interval instead of also on every completion
    #[arg(long, overrides_with = "wake_on_release")]
    pub poll_only: bool,

    /// Re-scan on every completion (default; overrides the config file)
    #[arg(long, overrides_with = "poll_only")]
    pub wake_on_release: bool,

    /// Verify TLS certificates (off by default)
    #[arg(long, overrides_with = "no_verify_tls")]
    pub verify_tls: bool,

    /// Skip TLS certificate checks (default; overrides the config file)
    #[arg(long, overrides_with = "verify_tls")]
    pub no_verify_tls: bool,

    /// How repeated URLs get their result
    #[arg(long, value_enum, default_value_t = DuplicateMode::AwaitOwner)]
    pub duplicates: DuplicateMode,

    /// Give up on a single fetch after this many seconds (1-3600)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub fetch_timeout: Option<u64>,

    /// Cap on concurrent fetches across all hosts (1-10000)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=10000))]
    pub max_in_flight: Option<u64>,

    /// Print the run summary as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Read defaults from this config file instead of the default location
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

/// CLI spelling of [`DuplicatePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateMode {
    /// Wait for the first occurrence to finish and copy its outcome
    AwaitOwner,
    /// Report the first occurrence's file path immediately
    Eager,
}

impl From<DuplicateMode> for DuplicatePolicy {
    fn from(mode: DuplicateMode) -> Self {
        match mode {
            DuplicateMode::AwaitOwner => Self::AwaitOwner,
            DuplicateMode::Eager => Self::Eager,
        }
    }
}
