//! # GMW secure computation engine
//!
//! A semi-honest N-party implementation of the Goldreich-Micali-Wigderson
//! protocol: parties hold an XOR secret share of every input wire, evaluate
//! a Boolean circuit gate by gate (XOR and NOT locally, AND via pairwise
//! Diffie-Hellman-based oblivious transfer), and gossip their output shares
//! at the end to reconstruct the plaintext result.
//!
//! [orchestrator] is the main entry point of this library; the `participant`
//! binary is a thin CLI wrapper around it.
#![warn(missing_docs)]

pub mod circuit;
pub mod cli;
pub mod crypto;
pub mod error;
pub mod group;
pub mod input_files;
pub mod mesh;
pub mod orchestrator;
pub mod ot;
pub mod peer_link;
pub mod share_engine;
pub mod wire;
