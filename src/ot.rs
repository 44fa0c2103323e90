//! 1-of-n oblivious transfer, Diffie-Hellman based.
//!
//! Grounded in `examples/original_source/src/drivers/ot_driver.cxx` and
//! `include/drivers/ot_driver.hpp`: the sender picks `a`, publishes
//! `A = g^a`; the receiver picks `b`, publishes `B = g^b * A^choice`; the
//! sender derives one key per offered message as `k_i = (B / A^i)^a` and
//! the receiver derives the matching key for its own choice as
//! `k_choice = A^b`. Both sides land on the same key only at `i == choice`,
//! because `(B / A^i)^a = (g^b * A^(choice - i))^a = g^(ab) * A^(a*(choice
//! - i))`, which collapses to `g^(ab)` exactly when `i == choice`.
//!
//! Each derived key encrypts one offered message under AES-128-CBC; the
//! receiver can only decrypt the one ciphertext whose key it was able to
//! derive. The `A`/`B` exchange and the batch of ciphertexts all travel
//! inside the calling [`crate::peer_link::PeerLink`]'s authenticated
//! envelope, so an active tamperer is caught by the MAC before OT's own
//! algebra is ever exercised.

use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use std::io::{Read, Write};

use crate::crypto::{aes_cbc_decrypt, aes_cbc_encrypt, derive_ot_key};
use crate::error::EngineError;
use crate::group::group;
use crate::peer_link::PeerLink;
use crate::wire::Message;

/// Offer `messages` for transfer; the peer picks which one it receives.
pub fn ot_send<S: Read + Write, R: RngCore + CryptoRng>(
    peer: &mut PeerLink<S>,
    rng: &mut R,
    messages: &[Vec<u8>],
) -> Result<(), EngineError> {
    let g = group();
    let a = g.sample_exponent(rng);
    let big_a = g.pow_mod(&g.g, &a);

    peer.send_enveloped(&Message::OtSenderPublic {
        a: big_a.to_bytes_be(),
    })?;

    let big_b = match peer.recv_enveloped()? {
        Message::OtReceiverPublic { b } => BigUint::from_bytes_be(&b),
        _ => {
            return Err(EngineError::ProtocolViolation(
                "expected the OT receiver's public value".into(),
            ))
        }
    };
    g.check_public_value(&big_b)?;

    let mut ciphertexts = Vec::with_capacity(messages.len());
    let mut ivs = Vec::with_capacity(messages.len());
    for (i, message) in messages.iter().enumerate() {
        let a_pow_i = g.pow_mod(&big_a, &BigUint::from(i as u64));
        let a_pow_i_inv = g.inv_mod(&a_pow_i);
        let base = (&big_b * &a_pow_i_inv) % &g.p;
        let k_i = g.pow_mod(&base, &a);
        let key = derive_ot_key(&k_i);
        let (ciphertext, iv) = aes_cbc_encrypt(rng, &key, message);
        ciphertexts.push(ciphertext);
        ivs.push(iv.to_vec());
    }

    peer.send_enveloped(&Message::OtEncrypted { ciphertexts, ivs })
}

/// Receive the message at index `choice` out of `n` offered by the sender,
/// learning nothing about the others.
pub fn ot_recv<S: Read + Write, R: RngCore + CryptoRng>(
    peer: &mut PeerLink<S>,
    rng: &mut R,
    n: usize,
    choice: usize,
) -> Result<Vec<u8>, EngineError> {
    if choice >= n {
        return Err(EngineError::ProtocolViolation(format!(
            "OT choice index {choice} is out of range for {n} offered messages"
        )));
    }

    let g = group();
    let big_a = match peer.recv_enveloped()? {
        Message::OtSenderPublic { a } => BigUint::from_bytes_be(&a),
        _ => {
            return Err(EngineError::ProtocolViolation(
                "expected the OT sender's public value".into(),
            ))
        }
    };
    g.check_public_value(&big_a)?;

    let b = g.sample_exponent(rng);
    let big_b = (g.pow_mod(&g.g, &b) * g.pow_mod(&big_a, &BigUint::from(choice as u64))) % &g.p;
    peer.send_enveloped(&Message::OtReceiverPublic {
        b: big_b.to_bytes_be(),
    })?;

    let (ciphertexts, ivs) = match peer.recv_enveloped()? {
        Message::OtEncrypted { ciphertexts, ivs } => (ciphertexts, ivs),
        _ => {
            return Err(EngineError::ProtocolViolation(
                "expected the OT sender's encrypted batch".into(),
            ))
        }
    };
    if ciphertexts.len() != n || ivs.len() != n {
        return Err(EngineError::ProtocolViolation(format!(
            "OT sender offered {} messages, expected {n}",
            ciphertexts.len()
        )));
    }

    let k_choice = g.pow_mod(&big_a, &b);
    let key = derive_ot_key(&k_choice);
    let iv: [u8; 16] = ivs[choice]
        .clone()
        .try_into()
        .map_err(|_| EngineError::FramingError("OT IV has the wrong length".into()))?;
    aes_cbc_decrypt(&key, &iv, &ciphertexts[choice])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peer_link::Role;
    use rand::thread_rng;
    use std::os::unix::net::UnixStream;

    fn linked_pair_with_keys() -> (PeerLink<UnixStream>, PeerLink<UnixStream>) {
        let (a, b) = UnixStream::pair().unwrap();
        let mut send_first = PeerLink::new(1, a);
        let mut recv_first = PeerLink::new(0, b);
        let handle = std::thread::spawn(move || {
            let mut rng = thread_rng();
            recv_first.key_exchange(Role::RecvFirst, &mut rng).unwrap();
            recv_first
        });
        let mut rng = thread_rng();
        send_first.key_exchange(Role::SendFirst, &mut rng).unwrap();
        (send_first, handle.join().unwrap())
    }

    #[test]
    fn receiver_gets_exactly_its_chosen_message() {
        let (mut sender, mut receiver) = linked_pair_with_keys();
        let messages: Vec<Vec<u8>> = (0u8..4).map(|i| vec![b'0' + i]).collect();
        let sent = messages.clone();
        let handle = std::thread::spawn(move || {
            let mut rng = thread_rng();
            ot_send(&mut sender, &mut rng, &sent).unwrap();
        });
        let mut rng = thread_rng();
        let got = ot_recv(&mut receiver, &mut rng, 4, 3).unwrap();
        handle.join().unwrap();
        assert_eq!(got, messages[3]);
    }

    #[test]
    fn different_choices_yield_different_messages() {
        for choice in 0..4 {
            let (mut sender, mut receiver) = linked_pair_with_keys();
            let messages: Vec<Vec<u8>> = (0u8..4).map(|i| vec![b'0' + i]).collect();
            let sent = messages.clone();
            let handle = std::thread::spawn(move || {
                let mut rng = thread_rng();
                ot_send(&mut sender, &mut rng, &sent).unwrap();
            });
            let mut rng = thread_rng();
            let got = ot_recv(&mut receiver, &mut rng, 4, choice).unwrap();
            handle.join().unwrap();
            assert_eq!(got, messages[choice]);
        }
    }

    #[test]
    fn rejects_choice_index_out_of_range() {
        let (_sender, mut receiver) = linked_pair_with_keys();
        let mut rng = thread_rng();
        let err = ot_recv(&mut receiver, &mut rng, 4, 4).unwrap_err();
        assert!(matches!(err, EngineError::ProtocolViolation(_)));
    }
}
