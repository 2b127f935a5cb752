//! Webhook signature verification (Svix scheme).
//!
//! The sender signs `"{msg_id}.{timestamp}.{body}"` with HMAC-SHA256 keyed by
//! the base64-decoded secret (the part after `whsec_`). The signature header
//! carries one or more space-separated `v1,<base64>` entries.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";

/// Maximum accepted clock skew between sender and receiver, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 5 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid webhook secret")]
    InvalidSecret,

    #[error("Invalid timestamp header")]
    InvalidTimestamp,

    #[error("Timestamp outside of tolerance window")]
    TimestampOutOfTolerance,

    #[error("No matching signature found")]
    NoMatchingSignature,
}

/// Decode a `whsec_`-prefixed (or bare) base64 webhook secret into key bytes.
fn decode_secret(secret: &str) -> Result<Vec<u8>, SignatureError> {
    let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
    STANDARD
        .decode(encoded)
        .map_err(|_| SignatureError::InvalidSecret)
}

/// Compute the base64 `v1` signature for a message.
pub fn sign_webhook(
    secret: &str,
    msg_id: &str,
    timestamp: i64,
    body: &[u8],
) -> Result<String, SignatureError> {
    let key = decode_secret(secret)?;
    let mut mac = HmacSha256::new_from_slice(&key).map_err(|_| SignatureError::InvalidSecret)?;

    mac.update(msg_id.as_bytes());
    mac.update(b".");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a webhook delivery against `now` (unix seconds).
pub fn verify_webhook(
    secret: &str,
    msg_id: &str,
    timestamp: &str,
    signature_header: &str,
    body: &[u8],
    now: i64,
) -> Result<(), SignatureError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;

    if now.abs_diff(ts) > DEFAULT_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let expected = sign_webhook(secret, msg_id, ts, body)?;
    let expected_bytes = expected.as_bytes();

    let matched = signature_header
        .split_whitespace()
        .filter_map(|entry| entry.split_once(','))
        .filter(|(version, _)| *version == "v1")
        .any(|(_, candidate)| {
            let candidate = candidate.as_bytes();
            candidate.len() == expected_bytes.len() && bool::from(candidate.ct_eq(expected_bytes))
        });

    if matched {
        Ok(())
    } else {
        Err(SignatureError::NoMatchingSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // base64("webhook-test-secret-key")
    const SECRET: &str = "whsec_d2ViaG9vay10ZXN0LXNlY3JldC1rZXk=";
    const NOW: i64 = 1_700_000_000;

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"user.created"}"#;
        let sig = sign_webhook(SECRET, "msg_1", NOW, body).unwrap();
        let header = format!("v1,{}", sig);

        assert_eq!(
            verify_webhook(SECRET, "msg_1", &NOW.to_string(), &header, body, NOW),
            Ok(())
        );
    }

    #[test]
    fn accepts_any_of_several_signatures() {
        let body = b"{}";
        let sig = sign_webhook(SECRET, "msg_2", NOW, body).unwrap();
        let header = format!("v1,bm90LWl0 v1,{}", sig);

        assert!(verify_webhook(SECRET, "msg_2", &NOW.to_string(), &header, body, NOW).is_ok());
    }

    #[test]
    fn rejects_tampered_body() {
        let sig = sign_webhook(SECRET, "msg_3", NOW, br#"{"a":1}"#).unwrap();
        let header = format!("v1,{}", sig);

        assert_eq!(
            verify_webhook(SECRET, "msg_3", &NOW.to_string(), &header, br#"{"a":2}"#, NOW),
            Err(SignatureError::NoMatchingSignature)
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let body = b"{}";
        let old = NOW - DEFAULT_TOLERANCE_SECS - 1;
        let sig = sign_webhook(SECRET, "msg_4", old, body).unwrap();
        let header = format!("v1,{}", sig);

        assert_eq!(
            verify_webhook(SECRET, "msg_4", &old.to_string(), &header, body, NOW),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn rejects_extreme_timestamps_without_overflow() {
        for ts in ["-9223372036854775808", "9223372036854775807"] {
            assert_eq!(
                verify_webhook(SECRET, "msg_7", ts, "v1,abc", b"{}", NOW),
                Err(SignatureError::TimestampOutOfTolerance)
            );
        }
    }

    #[test]
    fn rejects_unparseable_timestamp() {
        assert_eq!(
            verify_webhook(SECRET, "msg_5", "yesterday", "v1,abc", b"{}", NOW),
            Err(SignatureError::InvalidTimestamp)
        );
    }

    #[test]
    fn rejects_non_base64_secret() {
        assert_eq!(
            sign_webhook("whsec_***", "msg_6", NOW, b"{}"),
            Err(SignatureError::InvalidSecret)
        );
    }
}
