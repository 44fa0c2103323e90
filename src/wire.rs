//! The wire protocol: length-prefixed framing plus the tagged message enum
//! every [`crate::peer_link::PeerLink`] speaks.
//!
//! Every byte on the wire belongs to a frame: a 4-byte big-endian length,
//! then that many payload bytes (`read_frame`/`write_frame`). The first byte
//! of a decoded payload is a message-type tag (see [`Message`]). Variable
//! length fields are encoded as an 8-byte little-endian length followed by
//! the raw bytes (`write_var_bytes`/`read_var_bytes`).

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::error::EngineError;

const TAG_ENVELOPE: u8 = 1;
const TAG_DH_PUBLIC: u8 = 2;
const TAG_OT_SENDER_PUBLIC: u8 = 3;
const TAG_OT_RECEIVER_PUBLIC: u8 = 4;
const TAG_OT_ENCRYPTED: u8 = 5;
const TAG_INITIAL_SHARE: u8 = 10;
const TAG_FINAL_GOSSIP: u8 = 11;

/// A message as it appears inside (or, for [`Message::DhPublicValue`],
/// before) the authenticated envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A bare Diffie-Hellman public value, exchanged in the clear before
    /// session keys exist.
    DhPublicValue { public_value: Vec<u8> },
    /// The OT sender's ephemeral public value `A`.
    OtSenderPublic { a: Vec<u8> },
    /// The OT receiver's ephemeral public value `B`.
    OtReceiverPublic { b: Vec<u8> },
    /// The OT sender's `n` ciphertexts and their IVs, one pair per choice.
    OtEncrypted {
        ciphertexts: Vec<Vec<u8>>,
        ivs: Vec<Vec<u8>>,
    },
    /// One XOR share bit for one wire.
    InitialShare { share_value: bool },
    /// One party's output-share bitstring, gossiped at the end.
    FinalGossip { bits: Vec<bool> },
    /// The authenticated envelope wrapping every message above except
    /// [`Message::DhPublicValue`].
    Envelope {
        ciphertext: Vec<u8>,
        iv: Vec<u8>,
        mac: Vec<u8>,
    },
}

pub fn write_var_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    w.write_u64::<LittleEndian>(bytes.len() as u64)?;
    w.write_all(bytes)
}

pub fn read_var_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>, EngineError> {
    let len = r
        .read_u64::<LittleEndian>()
        .map_err(|_| EngineError::FramingError("truncated length prefix".into()))?;
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)
        .map_err(|_| EngineError::FramingError("truncated variable-length field".into()))?;
    Ok(buf)
}

impl Message {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Message::DhPublicValue { public_value } => {
                buf.push(TAG_DH_PUBLIC);
                write_var_bytes(&mut buf, public_value).expect("writing to Vec cannot fail");
            }
            Message::OtSenderPublic { a } => {
                buf.push(TAG_OT_SENDER_PUBLIC);
                write_var_bytes(&mut buf, a).expect("writing to Vec cannot fail");
            }
            Message::OtReceiverPublic { b } => {
                buf.push(TAG_OT_RECEIVER_PUBLIC);
                write_var_bytes(&mut buf, b).expect("writing to Vec cannot fail");
            }
            Message::OtEncrypted { ciphertexts, ivs } => {
                buf.push(TAG_OT_ENCRYPTED);
                buf.write_u64::<LittleEndian>(ciphertexts.len() as u64)
                    .expect("writing to Vec cannot fail");
                for c in ciphertexts {
                    write_var_bytes(&mut buf, c).expect("writing to Vec cannot fail");
                }
                for iv in ivs {
                    write_var_bytes(&mut buf, iv).expect("writing to Vec cannot fail");
                }
            }
            Message::InitialShare { share_value } => {
                buf.push(TAG_INITIAL_SHARE);
                buf.push(if *share_value { 1 } else { 0 });
            }
            Message::FinalGossip { bits } => {
                buf.push(TAG_FINAL_GOSSIP);
                let packed: Vec<u8> = bits.iter().map(|b| if *b { 1 } else { 0 }).collect();
                write_var_bytes(&mut buf, &packed).expect("writing to Vec cannot fail");
            }
            Message::Envelope {
                ciphertext,
                iv,
                mac,
            } => {
                buf.push(TAG_ENVELOPE);
                write_var_bytes(&mut buf, ciphertext).expect("writing to Vec cannot fail");
                write_var_bytes(&mut buf, iv).expect("writing to Vec cannot fail");
                write_var_bytes(&mut buf, mac).expect("writing to Vec cannot fail");
            }
        }
        buf
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let mut cursor = io::Cursor::new(bytes);
        let tag = cursor
            .read_u8()
            .map_err(|_| EngineError::FramingError("empty payload".into()))?;
        match tag {
            TAG_DH_PUBLIC => Ok(Message::DhPublicValue {
                public_value: read_var_bytes(&mut cursor)?,
            }),
            TAG_OT_SENDER_PUBLIC => Ok(Message::OtSenderPublic {
                a: read_var_bytes(&mut cursor)?,
            }),
            TAG_OT_RECEIVER_PUBLIC => Ok(Message::OtReceiverPublic {
                b: read_var_bytes(&mut cursor)?,
            }),
            TAG_OT_ENCRYPTED => {
                let n = cursor
                    .read_u64::<LittleEndian>()
                    .map_err(|_| EngineError::FramingError("truncated OT count".into()))?
                    as usize;
                let ciphertexts = (0..n)
                    .map(|_| read_var_bytes(&mut cursor))
                    .collect::<Result<Vec<_>, _>>()?;
                let ivs = (0..n)
                    .map(|_| read_var_bytes(&mut cursor))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Message::OtEncrypted { ciphertexts, ivs })
            }
            TAG_INITIAL_SHARE => {
                let bit = cursor
                    .read_u8()
                    .map_err(|_| EngineError::FramingError("truncated share bit".into()))?;
                Ok(Message::InitialShare {
                    share_value: bit != 0,
                })
            }
            TAG_FINAL_GOSSIP => {
                let packed = read_var_bytes(&mut cursor)?;
                Ok(Message::FinalGossip {
                    bits: packed.into_iter().map(|b| b != 0).collect(),
                })
            }
            TAG_ENVELOPE => Ok(Message::Envelope {
                ciphertext: read_var_bytes(&mut cursor)?,
                iv: read_var_bytes(&mut cursor)?,
                mac: read_var_bytes(&mut cursor)?,
            }),
            other => Err(EngineError::ProtocolViolation(format!(
                "unknown message tag {other}"
            ))),
        }
    }
}

/// Write one length-prefixed frame: a 4-byte big-endian length, then the payload.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), EngineError> {
    w.write_u32::<BigEndian>(payload.len() as u32)
        .map_err(|_| EngineError::Disconnected)?;
    w.write_all(payload).map_err(|_| EngineError::Disconnected)?;
    w.flush().map_err(|_| EngineError::Disconnected)
}

/// Read one length-prefixed frame. Returns `Disconnected` on EOF, including
/// an EOF that lands mid-message.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>, EngineError> {
    let len = match r.read_u32::<BigEndian>() {
        Ok(len) => len,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Err(EngineError::Disconnected),
        Err(_) => return Err(EngineError::FramingError("malformed length prefix".into())),
    };
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            EngineError::Disconnected
        } else {
            EngineError::FramingError(e.to_string())
        }
    })?;
    Ok(buf)
}

/// Serialize a [`Message`] and write it as one frame.
pub fn send_message<W: Write>(w: &mut W, msg: &Message) -> Result<(), EngineError> {
    write_frame(w, &msg.encode())
}

/// Read one frame and decode it as a [`Message`].
pub fn recv_message<R: Read>(r: &mut R) -> Result<Message, EngineError> {
    let bytes = read_frame(r)?;
    Message::decode(&bytes)
}
