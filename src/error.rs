//! Error types for the cryptographic core and the configuration layer.
//!
//! The two are kept separate on purpose: a [`ConfigError`] can only occur
//! before any socket is opened, while an [`EngineError`] is fatal to the
//! party wherever it occurs. Neither ever crosses into the other.

use thiserror::Error;

/// Errors from the GMW engine's cryptographic core: the mesh, the peer
/// links, the OT subprotocol, and the share engine. Every variant is fatal
/// to the party that observes it — there is no retry.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to bind listening socket: {0}")]
    BindFailed(std::io::Error),

    #[error("failed to accept an incoming connection: {0}")]
    AcceptFailed(std::io::Error),

    #[error("connection refused after exhausting retries to {addr}")]
    ConnectRefused { addr: String },

    #[error("malformed frame: {0}")]
    FramingError(String),

    #[error("peer disconnected mid-message")]
    Disconnected,

    #[error("HMAC verification failed")]
    MacFail,

    #[error("received Diffie-Hellman public value out of range [1, p)")]
    GroupElementOutOfRange,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

/// Errors from parsing the address file, circuit file, or input file, and
/// from cross-checking them against each other (e.g. wire-count mismatch).
/// Reported at startup; never propagates into the cryptographic core.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed address line {line_no} in {path}: {line}")]
    MalformedAddress {
        path: String,
        line_no: usize,
        line: String,
    },

    #[error("malformed input line {line_no} in {path}: {line}")]
    MalformedInput {
        path: String,
        line_no: usize,
        line: String,
    },

    #[error("malformed circuit file {path}: {reason}")]
    MalformedCircuit { path: String, reason: String },

    #[error("input file declares {declared} input wires but the circuit has {expected}")]
    InputLengthMismatch { declared: usize, expected: usize },

    #[error("party index {party} is out of range for {num_parties} parties")]
    PartyIndexOutOfRange { party: usize, num_parties: usize },
}
