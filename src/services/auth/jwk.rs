//! EC public keys as they travel in issue requests and DPoP proof headers,
//! plus the RFC 7638 thumbprint that serves as the per-key identity.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use p256::ecdsa::VerifyingKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const COORDINATE_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum JwkError {
    #[error("unsupported key type or curve")]
    Unsupported,
    #[error("invalid base64url coordinate")]
    BadCoordinate,
    #[error("point is not on P-256")]
    BadPoint,
}

/// P-256 public key in JWK form. Unknown members are ignored; missing
/// members deserialize as empty strings and fail the checks downstream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicJwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    pub y: String,
}

impl PublicJwk {
    pub fn is_p256(&self) -> bool {
        self.kty == "EC" && self.crv == "P-256"
    }
}

/// SHA-256 over the canonical JSON form, base64url without padding.
///
/// The canonical form is built by hand: members in lexicographic order,
/// no whitespace. A generic JSON encoder must not be substituted here —
/// the digest depends on the exact byte sequence.
pub fn thumbprint(jwk: &PublicJwk) -> Result<String, JwkError> {
    decode_coordinate(&jwk.x)?;
    decode_coordinate(&jwk.y)?;
    let canonical = format!(
        "{{\"crv\":\"{}\",\"kty\":\"{}\",\"x\":\"{}\",\"y\":\"{}\"}}",
        jwk.crv, jwk.kty, jwk.x, jwk.y
    );
    Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes())))
}

/// Build a P-256 verifying key from the JWK coordinates (SEC1 uncompressed
/// point). Rejects anything that is not EC/P-256 or not on the curve.
pub fn verifying_key(jwk: &PublicJwk) -> Result<VerifyingKey, JwkError> {
    if !jwk.is_p256() {
        return Err(JwkError::Unsupported);
    }
    let x = decode_coordinate(&jwk.x)?;
    let y = decode_coordinate(&jwk.y)?;

    let mut point = [0u8; 1 + 2 * COORDINATE_BYTES];
    point[0] = 0x04;
    point[1..1 + COORDINATE_BYTES].copy_from_slice(&x);
    point[1 + COORDINATE_BYTES..].copy_from_slice(&y);

    VerifyingKey::from_sec1_bytes(&point).map_err(|_| JwkError::BadPoint)
}

// Coordinates may arrive with leading zero bytes stripped; left-pad to the
// fixed field width.
fn decode_coordinate(value: &str) -> Result<[u8; COORDINATE_BYTES], JwkError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|_| JwkError::BadCoordinate)?;
    if bytes.is_empty() || bytes.len() > COORDINATE_BYTES {
        return Err(JwkError::BadCoordinate);
    }
    let mut out = [0u8; COORDINATE_BYTES];
    out[COORDINATE_BYTES - bytes.len()..].copy_from_slice(&bytes);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::ecdsa::SigningKey;
    use p256::elliptic_curve::rand_core::OsRng;

    fn random_jwk() -> PublicJwk {
        let key = SigningKey::random(&mut OsRng);
        let point = key.verifying_key().to_encoded_point(false);
        PublicJwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(point.x().expect("x coordinate")),
            y: URL_SAFE_NO_PAD.encode(point.y().expect("y coordinate")),
        }
    }

    #[test]
    fn thumbprint_is_deterministic() {
        let jwk = random_jwk();
        assert_eq!(thumbprint(&jwk).unwrap(), thumbprint(&jwk).unwrap());
    }

    #[test]
    fn thumbprint_ignores_json_field_order() {
        // Two serde paths with permuted member order must land on the same
        // struct and therefore the same digest.
        let jwk = random_jwk();
        let permuted: PublicJwk = serde_json::from_str(&format!(
            "{{\"y\":\"{}\",\"x\":\"{}\",\"crv\":\"P-256\",\"kty\":\"EC\"}}",
            jwk.y, jwk.x
        ))
        .unwrap();
        assert_eq!(thumbprint(&jwk).unwrap(), thumbprint(&permuted).unwrap());
    }

    #[test]
    fn thumbprint_depends_on_coordinates() {
        let a = random_jwk();
        let b = random_jwk();
        assert_ne!(thumbprint(&a).unwrap(), thumbprint(&b).unwrap());

        let mut swapped = a.clone();
        std::mem::swap(&mut swapped.x, &mut swapped.y);
        assert_ne!(thumbprint(&a).unwrap(), thumbprint(&swapped).unwrap());
    }

    #[test]
    fn thumbprint_rejects_undecodable_coordinates() {
        let mut jwk = random_jwk();
        jwk.x = "!!not-base64url!!".to_string();
        assert!(matches!(thumbprint(&jwk), Err(JwkError::BadCoordinate)));
    }

    #[test]
    fn verifying_key_roundtrips_through_jwk() {
        let key = SigningKey::random(&mut OsRng);
        let point = key.verifying_key().to_encoded_point(false);
        let jwk = PublicJwk {
            kty: "EC".to_string(),
            crv: "P-256".to_string(),
            x: URL_SAFE_NO_PAD.encode(point.x().unwrap()),
            y: URL_SAFE_NO_PAD.encode(point.y().unwrap()),
        };
        let recovered = verifying_key(&jwk).unwrap();
        assert_eq!(&recovered, key.verifying_key());
    }

    #[test]
    fn verifying_key_rejects_wrong_curve() {
        let mut jwk = random_jwk();
        jwk.crv = "P-384".to_string();
        assert!(matches!(verifying_key(&jwk), Err(JwkError::Unsupported)));

        let mut jwk = random_jwk();
        jwk.kty = "OKP".to_string();
        assert!(matches!(verifying_key(&jwk), Err(JwkError::Unsupported)));
    }

    #[test]
    fn verifying_key_rejects_off_curve_point() {
        let mut jwk = random_jwk();
        jwk.y = URL_SAFE_NO_PAD.encode([0xAAu8; 32]);
        assert!(verifying_key(&jwk).is_err());
    }
}
