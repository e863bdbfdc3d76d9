/*
 * Responsibility
 * - Mint HS256 access tokens bound to a client key thumbprint (cnf.jkt)
 * - Verify bearer signatures and gate registered claims stage by stage
 */
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

use crate::error::ApiError;

/// Audience tag carried by every token this gateway mints.
pub const AUDIENCE: &str = "ets";

/// Issued tokens back-date nbf by this much to tolerate small client
/// clock skew.
const NBF_SKEW_SECS: i64 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Confirmation {
    pub jkt: String,
}

/// Registered claims plus the confirmation binding. `aud` stays a raw
/// JSON value because the wire form may be a string or an array; the
/// audience gate handles both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AccessClaims {
    pub aud: Value,
    pub iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub jti: String,
    pub cnf: Confirmation,
}

impl AccessClaims {
    /// Claim gate, in pipeline order: audience, expiry, not-before, then
    /// the token id. An absent id maps to the replay code.
    pub fn validate(&self, now: i64) -> Result<(), ApiError> {
        if !audience_has(&self.aud, AUDIENCE) {
            return Err(ApiError::BadClaims);
        }
        let Some(exp) = self.exp else {
            return Err(ApiError::BadClaims);
        };
        if now > exp {
            return Err(ApiError::BadClaims);
        }
        if let Some(nbf) = self.nbf {
            if now < nbf {
                return Err(ApiError::BadClaims);
            }
        }
        if self.jti.is_empty() {
            return Err(ApiError::Replay);
        }
        Ok(())
    }
}

fn audience_has(aud: &Value, expected: &str) -> bool {
    match aud {
        Value::String(s) => s == expected,
        Value::Array(items) => items.iter().any(|v| v.as_str() == Some(expected)),
        _ => false,
    }
}

/// HS256 signer/verifier for the gateway's bearer tokens.
///
/// Key material is kept out of Debug output.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl TokenService {
    pub fn new(hs256_key: &[u8], lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(hs256_key),
            decoding_key: DecodingKey::from_secret(hs256_key),
            lifetime,
        }
    }

    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime.as_secs()
    }

    /// Mint a bearer bound to `jkt`. The token id only needs to be unique
    /// within this process: nanosecond timestamp plus pid.
    pub fn issue(&self, jkt: String) -> Result<String, ApiError> {
        let now = Utc::now();
        let now_secs = now.timestamp();
        let jti = format!(
            "{}-{}",
            now.timestamp_nanos_opt().unwrap_or_default(),
            std::process::id()
        );

        let claims = AccessClaims {
            aud: json!([AUDIENCE]),
            iat: now_secs,
            nbf: Some(now_secs - NBF_SKEW_SECS),
            exp: Some(now_secs + self.lifetime.as_secs() as i64),
            jti,
            cnf: Confirmation { jkt },
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|err| {
            error!(error = %err, "failed to sign access token");
            ApiError::SignError
        })
    }

    /// Verify the signature and parse the claims. Any header algorithm
    /// other than HS256 is rejected here. Temporal and audience checks
    /// are left to [`AccessClaims::validate`] so each failure keeps its
    /// own stage in the pipeline.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, ApiError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        decode::<AccessClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> TokenService {
        TokenService::new(KEY, Duration::from_secs(300))
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let tokens = service();
        let now = Utc::now().timestamp();

        let token = tokens.issue("thumb-1".to_string()).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert!(claims.validate(now).is_ok());
        assert_eq!(claims.cnf.jkt, "thumb-1");
        assert!(!claims.jti.is_empty());
        assert_eq!(claims.exp, Some(claims.iat + 300));
        assert_eq!(claims.nbf, Some(claims.iat - 1));
    }

    #[test]
    fn rejects_wrong_signing_key() {
        let token = service().issue("thumb".to_string()).unwrap();
        let other = TokenService::new(b"another-key-another-key-another!", Duration::from_secs(300));
        assert_eq!(other.verify(&token), Err(ApiError::InvalidToken));
    }

    #[test]
    fn rejects_non_hs256_algorithm() {
        // Same key, different MAC algorithm: the header must say HS256.
        let claims = AccessClaims {
            aud: json!([AUDIENCE]),
            exp: Some(Utc::now().timestamp() + 60),
            jti: "x".to_string(),
            ..Default::default()
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(KEY),
        )
        .unwrap();
        assert_eq!(service().verify(&token), Err(ApiError::InvalidToken));
    }

    #[test]
    fn rejects_garbage_token() {
        assert_eq!(
            service().verify("not-a-token"),
            Err(ApiError::InvalidToken)
        );
    }

    #[test]
    fn claim_gate_checks_audience() {
        let now = Utc::now().timestamp();
        let mut claims = AccessClaims {
            aud: json!(["somebody-else"]),
            exp: Some(now + 60),
            jti: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(claims.validate(now), Err(ApiError::BadClaims));

        claims.aud = json!(AUDIENCE);
        assert!(claims.validate(now).is_ok());

        claims.aud = json!(["other", AUDIENCE]);
        assert!(claims.validate(now).is_ok());
    }

    #[test]
    fn claim_gate_checks_temporal_bounds() {
        let now = Utc::now().timestamp();
        let mut claims = AccessClaims {
            aud: json!([AUDIENCE]),
            exp: Some(now - 1),
            jti: "x".to_string(),
            ..Default::default()
        };
        assert_eq!(claims.validate(now), Err(ApiError::BadClaims));

        claims.exp = None;
        assert_eq!(claims.validate(now), Err(ApiError::BadClaims));

        claims.exp = Some(now + 60);
        claims.nbf = Some(now + 30);
        assert_eq!(claims.validate(now), Err(ApiError::BadClaims));

        claims.nbf = Some(now - 30);
        assert!(claims.validate(now).is_ok());
    }

    #[test]
    fn claim_gate_maps_missing_jti_to_replay() {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            aud: json!([AUDIENCE]),
            exp: Some(now + 60),
            ..Default::default()
        };
        assert_eq!(claims.validate(now), Err(ApiError::Replay));
    }
}
