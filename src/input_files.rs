//! Parsing for the two small text configuration files the CLI takes
//! besides the circuit: the address file and the input file.
//!
//! Grounded in `examples/original_source/include-shared/util.hpp`'s
//! `InitialWireInput`, `parse_input`, and `parse_addrs` — same file
//! formats, reimplemented without `fscanf`.

use std::fs;
use std::path::Path;

use crate::circuit::Circuit;
use crate::error::ConfigError;

/// One input wire's owner and plaintext value, as read from the input file.
/// The i-th record in the file assigns the i-th input wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialWireInput {
    pub party_index: usize,
    pub value: bool,
}

/// Parse the address file: one `host:port` line per party, in party-index
/// order. Blank trailing lines are ignored.
pub fn parse_addrs(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut addrs = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.rsplit_once(':').is_none() {
            return Err(ConfigError::MalformedAddress {
                path: path.display().to_string(),
                line_no: line_no + 1,
                line: line.to_string(),
            });
        }
        addrs.push(line.to_string());
    }
    Ok(addrs)
}

/// Parse the input file: one `<party_index>:<bit>` line per input wire, in
/// wire-index order.
pub fn parse_input(path: impl AsRef<Path>) -> Result<Vec<InitialWireInput>, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut inputs = Vec::new();
    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let malformed = || ConfigError::MalformedInput {
            path: path.display().to_string(),
            line_no: line_no + 1,
            line: line.to_string(),
        };
        let (party_str, bit_str) = line.split_once(':').ok_or_else(malformed)?;
        let party_index: usize = party_str.trim().parse().map_err(|_| malformed())?;
        let value = match bit_str.trim() {
            "0" => false,
            "1" => true,
            _ => return Err(malformed()),
        };
        inputs.push(InitialWireInput { party_index, value });
    }
    Ok(inputs)
}

/// Cross-check the parsed input file against the circuit's declared input
/// length, and the parsed address file against the party index the CLI was
/// invoked with.
pub fn validate_config(
    circuit: &Circuit,
    inputs: &[InitialWireInput],
    addrs: &[String],
    my_party: usize,
) -> Result<(), ConfigError> {
    if inputs.len() != circuit.input_length {
        return Err(ConfigError::InputLengthMismatch {
            declared: inputs.len(),
            expected: circuit.input_length,
        });
    }
    if my_party >= addrs.len() {
        return Err(ConfigError::PartyIndexOutOfRange {
            party: my_party,
            num_parties: addrs.len(),
        });
    }
    Ok(())
}
