//! Command-line arguments for the `participant` binary.
//!
//! Grounded in `cli_utils.rs`'s `PrePSIArgs`/`KmprtArgs`: a `clap::Parser`
//! derive struct with doc comments as the generated `--help` text and
//! `#[arg(...)]` defaults for everything optional.

use std::path::PathBuf;

use clap::Parser;

/// Run one party of a semi-honest N-party GMW secure computation.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, next_line_help = true)]
pub struct Args {
    /// Path to the address file: one `host:port` per party, in party-index order.
    pub addr_file: PathBuf,

    /// Path to the Bristol-format circuit file to evaluate.
    pub circuit_file: PathBuf,

    /// Path to this party's input file: one `<party_index>:<bit>` line per input wire.
    pub input_file: PathBuf,

    /// This party's own index into the address file.
    pub my_party: usize,

    /// How many times to retry connecting to a peer whose listener isn't up yet.
    #[arg(long = "connect-retries", default_value_t = 20)]
    pub connect_retries: u32,

    /// Delay between connection retries, in milliseconds.
    #[arg(long = "connect-backoff-ms", default_value_t = 250)]
    pub connect_backoff_ms: u64,

    /// Print `tracing` logs at DEBUG level instead of INFO.
    ///
    /// Repeat the underlying `RUST_LOG` environment variable for finer
    /// control; this flag only sets the default when `RUST_LOG` is unset.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    pub verbose: bool,
}
