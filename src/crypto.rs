//! Symmetric primitives layered on top of the Diffie-Hellman shared secret:
//! HKDF key derivation, AES-128-CBC encryption, and HMAC-SHA256
//! authentication. Everything here is a pure function over byte slices —
//! no state, no sockets.

use aes::Aes128;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use rand::RngCore;
use sha2::Sha256;

use crate::error::EngineError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type HmacSha256 = Hmac<Sha256>;

pub const AES_KEY_LEN: usize = 16;
pub const HMAC_KEY_LEN: usize = 32;
pub const IV_LEN: usize = 16;

/// The pair of symmetric keys derived from one Diffie-Hellman shared secret.
#[derive(Clone)]
pub struct SessionKeys {
    pub aes_key: [u8; AES_KEY_LEN],
    pub hmac_key: [u8; HMAC_KEY_LEN],
}

/// Derive AES and HMAC keys from a raw DH shared secret via HKDF-SHA256,
/// using the labels "AES" and "HMAC" as the `info` parameter.
pub fn derive_session_keys(shared_secret: &BigUint) -> SessionKeys {
    let ikm = shared_secret.to_bytes_be();
    let hk = Hkdf::<Sha256>::new(None, &ikm);

    let mut aes_key = [0u8; AES_KEY_LEN];
    hk.expand(b"AES", &mut aes_key)
        .expect("AES_KEY_LEN is a valid HKDF output length");

    let mut hmac_key = [0u8; HMAC_KEY_LEN];
    hk.expand(b"HMAC", &mut hmac_key)
        .expect("HMAC_KEY_LEN is a valid HKDF output length");

    SessionKeys { aes_key, hmac_key }
}

/// Derive a single symmetric key (used for per-choice OT encryption keys,
/// where there's no separate MAC key needed — the outer PeerLink envelope
/// already authenticates the whole OT message).
pub fn derive_ot_key(k_i: &BigUint) -> [u8; AES_KEY_LEN] {
    let ikm = k_i.to_bytes_be();
    let hk = Hkdf::<Sha256>::new(None, &ikm);
    let mut key = [0u8; AES_KEY_LEN];
    hk.expand(b"OT", &mut key)
        .expect("AES_KEY_LEN is a valid HKDF output length");
    key
}

/// Encrypt `plaintext` under `key` with a fresh random IV. Returns `(ciphertext, iv)`.
pub fn aes_cbc_encrypt<R: RngCore>(
    rng: &mut R,
    key: &[u8; AES_KEY_LEN],
    plaintext: &[u8],
) -> (Vec<u8>, [u8; IV_LEN]) {
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);
    let ciphertext = Aes128CbcEnc::new(key.into(), &iv.into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    (ciphertext, iv)
}

/// Decrypt `ciphertext` under `key` and `iv`. Fails if the padding is invalid.
pub fn aes_cbc_decrypt(
    key: &[u8; AES_KEY_LEN],
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EngineError> {
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EngineError::MacFail)
}

/// Compute HMAC-SHA256 over `ciphertext ‖ iv`.
pub fn hmac_tag(hmac_key: &[u8; HMAC_KEY_LEN], ciphertext: &[u8], iv: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(hmac_key).expect("HMAC accepts any key length");
    mac.update(ciphertext);
    mac.update(iv);
    mac.finalize().into_bytes().to_vec()
}

/// Verify an HMAC tag in constant time.
pub fn hmac_verify(
    hmac_key: &[u8; HMAC_KEY_LEN],
    ciphertext: &[u8],
    iv: &[u8],
    tag: &[u8],
) -> bool {
    let mut mac = HmacSha256::new_from_slice(hmac_key).expect("HMAC accepts any key length");
    mac.update(ciphertext);
    mac.update(iv);
    mac.verify_slice(tag).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn aes_cbc_round_trips() {
        let key = [7u8; AES_KEY_LEN];
        let mut rng = thread_rng();
        let (ct, iv) = aes_cbc_encrypt(&mut rng, &key, b"attack at dawn");
        let pt = aes_cbc_decrypt(&key, &iv, &ct).unwrap();
        assert_eq!(pt, b"attack at dawn");
    }

    #[test]
    fn hmac_detects_single_bit_flip_in_ciphertext() {
        let hmac_key = [3u8; HMAC_KEY_LEN];
        let mut ct = vec![1, 2, 3, 4];
        let iv = [0u8; IV_LEN];
        let tag = hmac_tag(&hmac_key, &ct, &iv);
        assert!(hmac_verify(&hmac_key, &ct, &iv, &tag));
        ct[0] ^= 1;
        assert!(!hmac_verify(&hmac_key, &ct, &iv, &tag));
    }

    #[test]
    fn hmac_detects_single_bit_flip_in_mac() {
        let hmac_key = [3u8; HMAC_KEY_LEN];
        let ct = vec![1, 2, 3, 4];
        let iv = [0u8; IV_LEN];
        let mut tag = hmac_tag(&hmac_key, &ct, &iv);
        tag[0] ^= 1;
        assert!(!hmac_verify(&hmac_key, &ct, &iv, &tag));
    }

    #[test]
    fn derived_keys_agree_for_matching_shared_secret() {
        let secret = BigUint::from(123456789u64);
        let a = derive_session_keys(&secret);
        let b = derive_session_keys(&secret);
        assert_eq!(a.aes_key, b.aes_key);
        assert_eq!(a.hmac_key, b.hmac_key);
    }
}
