//! The `participant` binary: one process, one party.
//!
//! Grounded in `examples/original_source/src/cmd/participant.cxx`'s `main`
//! and in the teacher crate's `kmprt17/main.rs` (`clap::Parser` then hand
//! off to the protocol), with exit codes split the way
//! `examples/original_source/src/cmd/participant.cxx` distinguishes a bad
//! invocation from a protocol failure: a malformed CLI invocation or a
//! malformed configuration both exit 1, a network or protocol abort exits
//! 2. `Args::try_parse` (not `Args::parse`) keeps a bad invocation on the
//! same exit code as every other configuration error instead of clap's
//! own default of 2, which would otherwise collide with
//! `EXIT_PROTOCOL_ERROR`.

use clap::Parser;
use gmw_engine::cli::Args;
use gmw_engine::orchestrator::{self, RunConfig};
use tracing_subscriber::EnvFilter;

const EXIT_CONFIG_ERROR: i32 = 1;
const EXIT_PROTOCOL_ERROR: i32 = 2;

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let retry = orchestrator::retry_policy(args.connect_retries, args.connect_backoff_ms);
    let config = match RunConfig::load(
        &args.addr_file,
        &args.circuit_file,
        &args.input_file,
        args.my_party,
        retry,
    ) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {e}");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    match orchestrator::run(config) {
        Ok(output) => {
            let bits: String = output.iter().map(|b| if *b { '1' } else { '0' }).collect();
            println!("{bits}");
        }
        Err(e) => {
            eprintln!("protocol aborted: {e}");
            std::process::exit(EXIT_PROTOCOL_ERROR);
        }
    }
}
