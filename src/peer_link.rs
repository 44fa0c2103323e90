//! `PeerLink`: one party's authenticated endpoint of the channel to exactly
//! one other party.
//!
//! Grounded in `examples/original_source/src/pkg/peer_link.cxx`
//! (`SendFirstHandleKeyExchange`/`ReadFirstHandleKeyExchange`,
//! `SendSecretShare`/`ReceiveSecretShare`, `GossipSend`/`GossipReceive`) —
//! same responsibilities, reimplemented over our own framed transport
//! instead of a `NetworkDriver`/`CryptoDriver` pair. Generic over the
//! underlying stream so tests can use `UnixStream::pair()` the way the
//! teacher crate's channel tests do, while the mesh connector hands out
//! `PeerLink<TcpStream>` in production.

use rand::{CryptoRng, RngCore};
use std::io::{Read, Write};

use crate::crypto::{
    aes_cbc_decrypt, aes_cbc_encrypt, derive_session_keys, hmac_tag, hmac_verify, SessionKeys,
    IV_LEN,
};
use crate::error::EngineError;
use crate::group::group;
use crate::ot;
use crate::wire::{self, Message};

/// Which half of the Diffie-Hellman exchange this party plays on a link.
/// Assigned by index comparison: `recv_first` for peers with a lower index,
/// `send_first` for peers with a higher one — matching the Mesh Connector's
/// accept/connect split so no two `send_first` sides ever meet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    SendFirst,
    RecvFirst,
}

impl Role {
    pub fn for_peers(me: usize, other: usize) -> Self {
        if me < other {
            Role::SendFirst
        } else {
            Role::RecvFirst
        }
    }
}

/// One party's endpoint of one authenticated channel to `other`.
pub struct PeerLink<S> {
    pub other: usize,
    stream: S,
    keys: Option<SessionKeys>,
}

impl<S: Read + Write> PeerLink<S> {
    pub fn new(other: usize, stream: S) -> Self {
        Self {
            other,
            stream,
            keys: None,
        }
    }

    /// Diffie-Hellman key exchange. Populates the AES/HMAC keys; returns
    /// once both sides agree.
    pub fn key_exchange<R: RngCore + CryptoRng>(
        &mut self,
        role: Role,
        rng: &mut R,
    ) -> Result<(), EngineError> {
        let g = group();
        let x = g.sample_exponent(rng);
        let big_x = g.pow_mod(&g.g, &x);

        let peer_public = match role {
            Role::SendFirst => {
                wire::send_message(
                    &mut self.stream,
                    &Message::DhPublicValue {
                        public_value: big_x.to_bytes_be(),
                    },
                )?;
                self.recv_dh_public()?
            }
            Role::RecvFirst => {
                let y = self.recv_dh_public()?;
                wire::send_message(
                    &mut self.stream,
                    &Message::DhPublicValue {
                        public_value: big_x.to_bytes_be(),
                    },
                )?;
                y
            }
        };

        g.check_public_value(&peer_public)?;
        let shared_secret = g.pow_mod(&peer_public, &x);
        self.keys = Some(derive_session_keys(&shared_secret));
        Ok(())
    }

    fn recv_dh_public(&mut self) -> Result<num_bigint::BigUint, EngineError> {
        match wire::recv_message(&mut self.stream)? {
            Message::DhPublicValue { public_value } => {
                Ok(num_bigint::BigUint::from_bytes_be(&public_value))
            }
            _ => Err(EngineError::ProtocolViolation(
                "expected a DH public value".into(),
            )),
        }
    }

    fn keys(&self) -> Result<&SessionKeys, EngineError> {
        self.keys.as_ref().ok_or_else(|| {
            EngineError::ProtocolViolation("session keys not established yet".into())
        })
    }

    /// Encrypt-then-MAC `msg` and send it as one frame.
    pub fn send_enveloped(&mut self, msg: &Message) -> Result<(), EngineError> {
        let keys = self.keys()?.clone();
        let plaintext = msg.encode();
        let mut rng = rand::thread_rng();
        let (ciphertext, iv) = aes_cbc_encrypt(&mut rng, &keys.aes_key, &plaintext);
        let mac = hmac_tag(&keys.hmac_key, &ciphertext, &iv);
        wire::send_message(
            &mut self.stream,
            &Message::Envelope {
                ciphertext,
                iv: iv.to_vec(),
                mac,
            },
        )
    }

    /// Receive one frame, verify its MAC, and decrypt it.
    pub fn recv_enveloped(&mut self) -> Result<Message, EngineError> {
        let keys = self.keys()?.clone();
        let (ciphertext, iv, mac) = match wire::recv_message(&mut self.stream)? {
            Message::Envelope {
                ciphertext,
                iv,
                mac,
            } => (ciphertext, iv, mac),
            _ => {
                return Err(EngineError::ProtocolViolation(
                    "expected an authenticated envelope".into(),
                ))
            }
        };
        if !hmac_verify(&keys.hmac_key, &ciphertext, &iv, &mac) {
            return Err(EngineError::MacFail);
        }
        let iv: [u8; IV_LEN] = iv
            .try_into()
            .map_err(|_| EngineError::FramingError("IV has the wrong length".into()))?;
        let plaintext = aes_cbc_decrypt(&keys.aes_key, &iv, &ciphertext)?;
        Message::decode(&plaintext)
    }

    /// Send one XOR share bit. The peer's next `recv_share` yields it.
    pub fn send_share(&mut self, bit: bool) -> Result<(), EngineError> {
        self.send_enveloped(&Message::InitialShare { share_value: bit })
    }

    /// Receive the next share bit sent by the peer.
    pub fn recv_share(&mut self) -> Result<bool, EngineError> {
        match self.recv_enveloped()? {
            Message::InitialShare { share_value } => Ok(share_value),
            _ => Err(EngineError::ProtocolViolation(
                "expected an initial share".into(),
            )),
        }
    }

    /// Gossip our output-share bitstring to the peer.
    pub fn gossip_send(&mut self, bits: &[bool]) -> Result<(), EngineError> {
        self.send_enveloped(&Message::FinalGossip {
            bits: bits.to_vec(),
        })
    }

    /// Receive the peer's output-share bitstring.
    pub fn gossip_recv(&mut self) -> Result<Vec<bool>, EngineError> {
        match self.recv_enveloped()? {
            Message::FinalGossip { bits } => Ok(bits),
            _ => Err(EngineError::ProtocolViolation(
                "expected a final gossip message".into(),
            )),
        }
    }

    /// Send `v[0..n)` via 1-of-n oblivious transfer; the peer's matching
    /// `ot_recv(c)` yields `v[c]` and learns nothing about `v[j != c]`.
    pub fn ot_send<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        v: &[Vec<u8>],
    ) -> Result<(), EngineError> {
        ot::ot_send(self, rng, v)
    }

    /// Receive `v[c]` via 1-of-n oblivious transfer from a sender offering
    /// `n` messages, without learning any `v[j != c]`.
    pub fn ot_recv<R: RngCore + CryptoRng>(
        &mut self,
        rng: &mut R,
        n: usize,
        choice: usize,
    ) -> Result<Vec<u8>, EngineError> {
        ot::ot_recv(self, rng, n, choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;
    use std::os::unix::net::UnixStream;

    fn linked_pair() -> (PeerLink<UnixStream>, PeerLink<UnixStream>) {
        let (a, b) = UnixStream::pair().unwrap();
        (PeerLink::new(1, a), PeerLink::new(0, b))
    }

    #[test]
    fn key_exchange_agrees_on_both_sides() {
        let (mut send_first, mut recv_first) = linked_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = thread_rng();
            recv_first.key_exchange(Role::RecvFirst, &mut rng).unwrap();
            recv_first
        });
        let mut rng = thread_rng();
        send_first.key_exchange(Role::SendFirst, &mut rng).unwrap();
        let recv_first = handle.join().unwrap();

        assert_eq!(
            send_first.test_keys().unwrap().aes_key,
            recv_first.test_keys().unwrap().aes_key
        );
        assert_eq!(
            send_first.test_keys().unwrap().hmac_key,
            recv_first.test_keys().unwrap().hmac_key
        );
    }

    fn linked_pair_with_keys() -> (PeerLink<UnixStream>, PeerLink<UnixStream>) {
        let (mut send_first, mut recv_first) = linked_pair();
        let handle = std::thread::spawn(move || {
            let mut rng = thread_rng();
            recv_first.key_exchange(Role::RecvFirst, &mut rng).unwrap();
            recv_first
        });
        let mut rng = thread_rng();
        send_first.key_exchange(Role::SendFirst, &mut rng).unwrap();
        let recv_first = handle.join().unwrap();
        (send_first, recv_first)
    }

    #[test]
    fn share_round_trips() {
        let (mut a, mut b) = linked_pair_with_keys();
        let handle = std::thread::spawn(move || {
            b.send_share(true).unwrap();
            b.recv_share().unwrap()
        });
        a.send_share(false).unwrap();
        assert!(a.recv_share().unwrap());
        assert!(!handle.join().unwrap());
    }

    #[test]
    fn gossip_round_trips() {
        let (mut a, mut b) = linked_pair_with_keys();
        let bits = vec![true, false, true];
        let handle = std::thread::spawn(move || {
            b.gossip_recv().unwrap()
        });
        a.gossip_send(&bits).unwrap();
        assert_eq!(handle.join().unwrap(), bits);
    }

    #[test]
    fn ot_receiver_learns_only_its_choice() {
        let (mut sender, mut receiver) = linked_pair_with_keys();
        let messages: Vec<Vec<u8>> = vec![vec![b'0'], vec![b'1'], vec![b'1'], vec![b'0']];
        let messages_clone = messages.clone();
        let handle = std::thread::spawn(move || {
            let mut rng = thread_rng();
            sender.ot_send(&mut rng, &messages_clone).unwrap();
        });
        let mut rng = thread_rng();
        let result = receiver.ot_recv(&mut rng, 4, 2).unwrap();
        handle.join().unwrap();
        assert_eq!(result, messages[2]);
    }

    #[test]
    fn recv_share_rejects_a_mismatched_message_type() {
        let (mut a, mut b) = linked_pair_with_keys();
        let handle = std::thread::spawn(move || b.recv_share());
        a.gossip_send(&[true]).unwrap();
        let err = handle.join().unwrap().unwrap_err();
        assert!(matches!(err, EngineError::ProtocolViolation(_)));
    }

    impl<S: Read + Write> PeerLink<S> {
        fn test_keys(&self) -> Option<&SessionKeys> {
            self.keys.as_ref()
        }
    }
}
