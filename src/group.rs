//! The fixed Diffie-Hellman group every party agrees on ahead of time.
//!
//! Group parameters are process-wide immutable constants, constructed once
//! and handed out by reference — never read from configuration or the
//! environment. We use the 2048-bit MODP group from RFC 3526 ("Group 14")
//! with generator 2; its order-`q` subgroup (`q = (p - 1) / 2`) is where
//! Diffie-Hellman exponents live.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::RngCore;
use std::sync::OnceLock;

use crate::error::EngineError;

const P_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD",
    "129024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED5290770969669D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA051",
    "015728E5A8AACAA68FFFFFFFFFFFFFFFF",
);

/// A fixed prime-order Diffie-Hellman group: modulus `p`, generator `g`,
/// and subgroup order `q`.
pub struct GroupParams {
    pub p: BigUint,
    pub g: BigUint,
    pub q: BigUint,
}

impl GroupParams {
    fn new() -> Self {
        let p = BigUint::parse_bytes(P_HEX.as_bytes(), 16).expect("RFC 3526 prime is valid hex");
        let g = BigUint::from(2u32);
        let q = (&p - BigUint::one()) / BigUint::from(2u32);
        Self { p, g, q }
    }

    /// Sample a Diffie-Hellman exponent uniformly in `[1, q)`.
    pub fn sample_exponent<R: RngCore>(&self, rng: &mut R) -> BigUint {
        loop {
            let bytes_needed = self.q.bits().div_ceil(8) as usize;
            let mut bytes = vec![0u8; bytes_needed];
            rng.fill_bytes(&mut bytes);
            let candidate = BigUint::from_bytes_be(&bytes) % &self.q;
            if !candidate.is_zero() {
                return candidate;
            }
        }
    }

    /// `base^exp mod p`.
    pub fn pow_mod(&self, base: &BigUint, exp: &BigUint) -> BigUint {
        base.modpow(exp, &self.p)
    }

    /// `base^-1 mod p`, computed via Fermat's little theorem since `p` is prime.
    pub fn inv_mod(&self, base: &BigUint) -> BigUint {
        let p_minus_two = &self.p - BigUint::from(2u32);
        base.modpow(&p_minus_two, &self.p)
    }

    /// Reject public DH values outside `[1, p)`, per the `GroupElementOutOfRange` error.
    pub fn check_public_value(&self, v: &BigUint) -> Result<(), EngineError> {
        if v.is_zero() || v >= &self.p {
            Err(EngineError::GroupElementOutOfRange)
        } else {
            Ok(())
        }
    }
}

static GROUP: OnceLock<GroupParams> = OnceLock::new();

/// The shared group parameters, initialized on first use.
pub fn group() -> &'static GroupParams {
    GROUP.get_or_init(GroupParams::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    #[test]
    fn q_is_half_of_p_minus_one() {
        let g = group();
        assert_eq!(&g.q * BigUint::from(2u32) + BigUint::one(), g.p);
    }

    #[test]
    fn sampled_exponents_are_in_range() {
        let g = group();
        let mut rng = thread_rng();
        for _ in 0..64 {
            let x = g.sample_exponent(&mut rng);
            assert!(x >= BigUint::one() && x < g.q);
        }
    }

    #[test]
    fn inv_mod_round_trips() {
        let g = group();
        let mut rng = thread_rng();
        let x = g.sample_exponent(&mut rng);
        let gx = g.pow_mod(&g.g, &x);
        let inv = g.inv_mod(&gx);
        assert_eq!((&gx * &inv) % &g.p, BigUint::one());
    }

    #[test]
    fn rejects_out_of_range_public_value() {
        let g = group();
        assert!(g.check_public_value(&BigUint::zero()).is_err());
        assert!(g.check_public_value(&g.p).is_err());
        assert!(g.check_public_value(&g.g).is_ok());
    }
}
