//! Bristol-format Boolean circuit parsing and the in-memory circuit model.
//!
//! Grounded in `examples/original_source/src-shared/circuit.cxx`: the file
//! format (gate-count/wire-count header, input/output segment-length
//! header, blank line, then one gate per line) is unchanged, just
//! reimplemented with `str::split_whitespace` instead of `fscanf`.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// One gate's operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateType {
    And,
    Xor,
    Not,
}

impl fmt::Display for GateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateType::And => write!(f, "AND"),
            GateType::Xor => write!(f, "XOR"),
            GateType::Not => write!(f, "INV"),
        }
    }
}

/// One gate: its type and the wire indices it reads from and writes to.
/// `right` is unused (and set to `0`) for [`GateType::Not`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gate {
    pub gate_type: GateType,
    pub left: usize,
    pub right: usize,
    pub output: usize,
}

/// A Boolean circuit in Bristol-derived form: a flat, topologically ordered
/// gate list over a fixed number of wires, with the first `input_length`
/// wires reserved for inputs and the last `output_length` wires for
/// outputs.
#[derive(Debug, Clone)]
pub struct Circuit {
    pub num_wires: usize,
    pub num_gates: usize,
    pub input_length: usize,
    pub output_length: usize,
    pub gates: Vec<Gate>,
}

impl Circuit {
    /// The half-open range of wire indices holding the circuit's output,
    /// read in increasing order (the first output bit is the lowest-indexed
    /// wire in the range).
    pub fn output_wires(&self) -> std::ops::Range<usize> {
        (self.num_wires - self.output_length)..self.num_wires
    }

    pub fn parse(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse_str(&contents, &path.display().to_string())
    }

    fn parse_str(contents: &str, path: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedCircuit {
            path: path.to_string(),
            reason: reason.to_string(),
        };

        let mut tokens = contents.split_whitespace();

        let num_gates: usize = tokens
            .next()
            .ok_or_else(|| malformed("missing gate count"))?
            .parse()
            .map_err(|_| malformed("gate count is not a number"))?;
        let num_wires: usize = tokens
            .next()
            .ok_or_else(|| malformed("missing wire count"))?
            .parse()
            .map_err(|_| malformed("wire count is not a number"))?;

        let garbler_input_length: usize = tokens
            .next()
            .ok_or_else(|| malformed("missing garbler input length"))?
            .parse()
            .map_err(|_| malformed("garbler input length is not a number"))?;
        let evaluator_input_length: usize = tokens
            .next()
            .ok_or_else(|| malformed("missing evaluator input length"))?
            .parse()
            .map_err(|_| malformed("evaluator input length is not a number"))?;
        let output_length: usize = tokens
            .next()
            .ok_or_else(|| malformed("missing output length"))?
            .parse()
            .map_err(|_| malformed("output length is not a number"))?;

        let input_length = garbler_input_length + evaluator_input_length;
        if output_length > num_wires {
            return Err(malformed("output length exceeds wire count"));
        }

        let mut gates = Vec::with_capacity(num_gates);
        for _ in 0..num_gates {
            let arity: usize = tokens
                .next()
                .ok_or_else(|| malformed("unexpected end of gate list"))?
                .parse()
                .map_err(|_| malformed("gate arity is not a number"))?;

            let gate = match arity {
                2 => {
                    let _num_outputs: usize = tokens
                        .next()
                        .ok_or_else(|| malformed("missing output count"))?
                        .parse()
                        .map_err(|_| malformed("output count is not a number"))?;
                    let left = parse_wire(&mut tokens, &malformed)?;
                    let right = parse_wire(&mut tokens, &malformed)?;
                    let output = parse_wire(&mut tokens, &malformed)?;
                    let op = tokens
                        .next()
                        .ok_or_else(|| malformed("missing gate operator"))?;
                    let gate_type = match op {
                        "AND" => GateType::And,
                        "XOR" => GateType::Xor,
                        other => {
                            return Err(malformed(&format!("unknown 2-input gate operator {other}")))
                        }
                    };
                    Gate {
                        gate_type,
                        left,
                        right,
                        output,
                    }
                }
                1 => {
                    let _num_outputs: usize = tokens
                        .next()
                        .ok_or_else(|| malformed("missing output count"))?
                        .parse()
                        .map_err(|_| malformed("output count is not a number"))?;
                    let left = parse_wire(&mut tokens, &malformed)?;
                    let output = parse_wire(&mut tokens, &malformed)?;
                    let op = tokens
                        .next()
                        .ok_or_else(|| malformed("missing gate operator"))?;
                    if op != "INV" {
                        return Err(malformed(&format!("unknown 1-input gate operator {op}")));
                    }
                    Gate {
                        gate_type: GateType::Not,
                        left,
                        right: 0,
                        output,
                    }
                }
                other => return Err(malformed(&format!("unsupported gate arity {other}"))),
            };
            gates.push(gate);
        }

        Ok(Circuit {
            num_wires,
            num_gates,
            input_length,
            output_length,
            gates,
        })
    }
}

fn parse_wire<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    malformed: &impl Fn(&str) -> ConfigError,
) -> Result<usize, ConfigError> {
    tokens
        .next()
        .ok_or_else(|| malformed("missing wire index"))?
        .parse()
        .map_err(|_| malformed("wire index is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_party_and_gate() {
        let text = "1 3\n1 1 1\n\n2 1 0 1 2 AND\n";
        let c = Circuit::parse_str(text, "test").unwrap();
        assert_eq!(c.num_gates, 1);
        assert_eq!(c.num_wires, 3);
        assert_eq!(c.input_length, 2);
        assert_eq!(c.output_length, 1);
        assert_eq!(c.gates[0].gate_type, GateType::And);
        assert_eq!(c.gates[0].left, 0);
        assert_eq!(c.gates[0].right, 1);
        assert_eq!(c.gates[0].output, 2);
        assert_eq!(c.output_wires(), 2..3);
    }

    #[test]
    fn parses_not_gate() {
        let text = "1 2\n1 0 1\n\n1 1 0 1 INV\n";
        let c = Circuit::parse_str(text, "test").unwrap();
        assert_eq!(c.gates[0].gate_type, GateType::Not);
        assert_eq!(c.gates[0].left, 0);
        assert_eq!(c.gates[0].output, 1);
    }

    #[test]
    fn parses_multi_output_circuit() {
        let text = "2 4\n1 1 2\n\n2 1 0 1 2 XOR\n2 1 0 1 3 AND\n";
        let c = Circuit::parse_str(text, "test").unwrap();
        assert_eq!(c.output_length, 2);
        assert_eq!(c.output_wires(), 2..4);
    }

    #[test]
    fn rejects_malformed_header() {
        let err = Circuit::parse_str("not a number 3\n1 1 1\n\n", "test").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedCircuit { .. }));
    }

    #[test]
    fn rejects_unknown_operator() {
        let text = "1 3\n1 1 1\n\n2 1 0 1 2 NOR\n";
        let err = Circuit::parse_str(text, "test").unwrap_err();
        assert!(matches!(err, ConfigError::MalformedCircuit { .. }));
    }
}
