//! DPoP proof types and ES256 signature verification.
//!
//! A proof is a compact JWS whose header pins `typ`/`alg` and embeds the
//! client's public JWK; the payload binds the proof to one method, one
//! URL, and one freshness window. Replay protection lives in
//! [`crate::services::auth::replay`], not here.

use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use serde::Deserialize;

use crate::services::auth::jwk::PublicJwk;

pub const DPOP_TYP: &str = "dpop+jwt";
pub const DPOP_ALG: &str = "ES256";

/// How long a proof's jti is held against reuse, counted from its iat.
pub const REPLAY_WINDOW_SECS: i64 = 5 * 60;
/// Tolerated forward clock drift for a proof's iat.
pub const ALLOWED_CLOCK_SKEW_SECS: i64 = 5;

/// JOSE signatures are the fixed r‖s form, 32 bytes each. DER is rejected
/// by length alone.
const JOSE_SIGNATURE_LEN: usize = 64;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DpopHeader {
    pub typ: String,
    pub alg: String,
    pub jwk: PublicJwk,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DpopPayload {
    pub htm: String,
    pub htu: String,
    pub jti: String,
    pub iat: i64,
}

impl DpopHeader {
    /// typ and alg are matched case-insensitively; the values themselves
    /// are fixed by the protocol.
    pub fn is_wellformed(&self) -> bool {
        self.typ.eq_ignore_ascii_case(DPOP_TYP) && self.alg.eq_ignore_ascii_case(DPOP_ALG)
    }
}

/// Verify an ES256 signature over the raw signing input.
pub fn verify_es256(signing_input: &[u8], signature: &[u8], key: &VerifyingKey) -> bool {
    if signature.len() != JOSE_SIGNATURE_LEN {
        return false;
    }
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(signing_input, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::{SigningKey, signature::Signer};
    use p256::elliptic_curve::rand_core::OsRng;

    #[test]
    fn accepts_valid_signature() {
        let key = SigningKey::random(&mut OsRng);
        let input = b"header.payload";
        let signature: Signature = key.sign(input);
        assert!(verify_es256(
            input,
            &signature.to_bytes(),
            key.verifying_key()
        ));
    }

    #[test]
    fn rejects_single_bit_flip() {
        let key = SigningKey::random(&mut OsRng);
        let input = b"header.payload";
        let signature: Signature = key.sign(input);
        let mut bytes = signature.to_bytes().to_vec();
        bytes[17] ^= 0x01;
        assert!(!verify_es256(input, &bytes, key.verifying_key()));
    }

    #[test]
    fn rejects_wrong_key() {
        let signer = SigningKey::random(&mut OsRng);
        let other = SigningKey::random(&mut OsRng);
        let input = b"header.payload";
        let signature: Signature = signer.sign(input);
        assert!(!verify_es256(
            input,
            &signature.to_bytes(),
            other.verifying_key()
        ));
    }

    #[test]
    fn rejects_non_jose_length() {
        let key = SigningKey::random(&mut OsRng);
        let input = b"header.payload";
        let signature: Signature = key.sign(input);
        // DER encoding of the same signature is longer than 64 bytes
        let der = signature.to_der();
        assert!(!verify_es256(input, der.as_bytes(), key.verifying_key()));
        assert!(!verify_es256(input, &[0u8; 63], key.verifying_key()));
        assert!(!verify_es256(input, &[], key.verifying_key()));
    }

    #[test]
    fn verification_is_deterministic() {
        let key = SigningKey::random(&mut OsRng);
        let input = b"the same input";
        let signature: Signature = key.sign(input);
        let bytes = signature.to_bytes();
        for _ in 0..10 {
            assert!(verify_es256(input, &bytes, key.verifying_key()));
        }
    }

    #[test]
    fn header_wellformed_is_case_insensitive() {
        let header = DpopHeader {
            typ: "DPoP+JWT".to_string(),
            alg: "es256".to_string(),
            jwk: PublicJwk::default(),
        };
        assert!(header.is_wellformed());

        let header = DpopHeader {
            typ: "jwt".to_string(),
            alg: "ES256".to_string(),
            jwk: PublicJwk::default(),
        };
        assert!(!header.is_wellformed());

        let header = DpopHeader {
            typ: "dpop+jwt".to_string(),
            alg: "EdDSA".to_string(),
            jwk: PublicJwk::default(),
        };
        assert!(!header.is_wellformed());
    }
}
