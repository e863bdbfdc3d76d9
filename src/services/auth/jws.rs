//! Compact JWS splitting for DPoP proofs.
//!
//! Deliberately not a JWT library call: the verifier needs the raw
//! `header.payload` bytes as the signing input, and every parse failure
//! must collapse into one opaque error so clients cannot probe which
//! segment was malformed.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
#[error("malformed compact jws")]
pub struct CompactJwsError;

pub struct CompactJws<H, P> {
    pub header: H,
    pub payload: P,
    /// Raw ASCII of the first two segments joined by `.` — exactly what
    /// the producer signed.
    pub signing_input: Vec<u8>,
    pub signature: Vec<u8>,
}

pub fn parse<H, P>(raw: &str) -> Result<CompactJws<H, P>, CompactJwsError>
where
    H: DeserializeOwned,
    P: DeserializeOwned,
{
    let mut parts = raw.split('.');
    let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(CompactJwsError);
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64)
        .map_err(|_| CompactJwsError)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| CompactJwsError)?;
    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| CompactJwsError)?;

    let header: H = serde_json::from_slice(&header_bytes).map_err(|_| CompactJwsError)?;
    let payload: P = serde_json::from_slice(&payload_bytes).map_err(|_| CompactJwsError)?;

    Ok(CompactJws {
        header,
        payload,
        signing_input: format!("{header_b64}.{payload_b64}").into_bytes(),
        signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn encode(value: &Value) -> String {
        URL_SAFE_NO_PAD.encode(value.to_string().as_bytes())
    }

    #[test]
    fn parses_three_segments() {
        let header = serde_json::json!({"alg": "ES256"});
        let payload = serde_json::json!({"jti": "abc"});
        let raw = format!(
            "{}.{}.{}",
            encode(&header),
            encode(&payload),
            URL_SAFE_NO_PAD.encode([1u8, 2, 3])
        );

        let jws: CompactJws<Value, Value> = parse(&raw).unwrap();
        assert_eq!(jws.header["alg"], "ES256");
        assert_eq!(jws.payload["jti"], "abc");
        assert_eq!(jws.signature, vec![1, 2, 3]);

        // signing input is the raw first two segments, not re-serialized JSON
        let expected = format!("{}.{}", encode(&header), encode(&payload));
        assert_eq!(jws.signing_input, expected.into_bytes());
    }

    #[test]
    fn rejects_wrong_part_count() {
        assert!(parse::<Value, Value>("one.two").is_err());
        assert!(parse::<Value, Value>("a.b.c.d").is_err());
        assert!(parse::<Value, Value>("").is_err());
    }

    #[test]
    fn rejects_bad_base64() {
        let ok = encode(&serde_json::json!({}));
        assert!(parse::<Value, Value>(&format!("{ok}.{ok}.!!!")).is_err());
        assert!(parse::<Value, Value>(&format!("не-base64.{ok}.AA")).is_err());
    }

    #[test]
    fn rejects_non_json_segments() {
        let not_json = URL_SAFE_NO_PAD.encode(b"plain text");
        let ok = encode(&serde_json::json!({}));
        assert!(parse::<Value, Value>(&format!("{not_json}.{ok}.AA")).is_err());
        assert!(parse::<Value, Value>(&format!("{ok}.{not_json}.AA")).is_err());
    }
}
