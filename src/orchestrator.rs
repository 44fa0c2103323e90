//! Orchestrator: the fixed phase sequence one participant binary runs
//! through, each phase a full barrier before the next begins.
//!
//! Grounded in `examples/original_source/src/cmd/participant.cxx`'s `main`:
//! parse config, connect, then hand off to the protocol. The later phases
//! (key exchange, share distribution, gate evaluation, gossip) are each
//! their own step here rather than interleaved, matching how that function
//! separates connection setup from `run_protocol`.

use std::time::Duration;

use rand::thread_rng;
use tracing::info;

use crate::circuit::Circuit;
use crate::error::{ConfigError, EngineError};
use crate::input_files::{self, InitialWireInput};
use crate::mesh::{self, RetryPolicy};
use crate::peer_link::Role;
use crate::share_engine::ShareEngine;

/// Parsed and cross-validated configuration for one run.
pub struct RunConfig {
    pub circuit: Circuit,
    pub inputs: Vec<InitialWireInput>,
    pub addrs: Vec<String>,
    pub my_party: usize,
    pub retry: RetryPolicy,
}

impl RunConfig {
    pub fn load(
        addr_file: impl AsRef<std::path::Path>,
        circuit_file: impl AsRef<std::path::Path>,
        input_file: impl AsRef<std::path::Path>,
        my_party: usize,
        retry: RetryPolicy,
    ) -> Result<Self, ConfigError> {
        let addrs = input_files::parse_addrs(addr_file)?;
        let circuit = Circuit::parse(circuit_file)?;
        let inputs = input_files::parse_input(input_file)?;
        input_files::validate_config(&circuit, &inputs, &addrs, my_party)?;
        Ok(Self {
            circuit,
            inputs,
            addrs,
            my_party,
            retry,
        })
    }
}

/// Run one participant end to end: connect to every peer, evaluate the
/// circuit, and return the reconstructed plaintext output bits.
pub fn run(config: RunConfig) -> Result<Vec<bool>, EngineError> {
    info!(party = config.my_party, "connecting mesh");
    let mut links = mesh::connect_mesh(config.my_party, &config.addrs, config.retry)?;

    let mut rng = thread_rng();
    for link in links.iter_mut() {
        let role = Role::for_peers(config.my_party, link.other);
        link.key_exchange(role, &mut rng)?;
    }
    info!(party = config.my_party, "key exchange complete");

    let mut engine = ShareEngine::new(config.my_party, links);
    let result = engine.evaluate(&config.circuit, &config.inputs, &mut rng)?;
    info!(party = config.my_party, "circuit evaluation complete");

    Ok(result)
}

/// A connect retry policy built from CLI-provided attempt count and
/// per-attempt backoff in milliseconds.
pub fn retry_policy(max_attempts: u32, backoff_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff: Duration::from_millis(backoff_ms),
    }
}
