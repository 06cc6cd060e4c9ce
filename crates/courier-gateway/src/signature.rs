//! Webhook signature verification.
//!
//! Implements the `v0=HMAC-SHA256(secret, "v0:{timestamp}:{body}")` scheme
//! used by Slack-style webhooks, with a replay window on the timestamp and
//! a constant-time comparison of the signature itself.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Signature scheme version prefix.
pub const SIGNATURE_VERSION: &str = "v0";

/// Maximum allowed clock skew between the request timestamp and now, in
/// seconds. Requests outside the window are replay-rejected.
pub const REPLAY_TOLERANCE_SECS: i64 = 300;

/// Computes the expected signature for a timestamped body.
pub fn expected_signature(signing_secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(signing_secret.as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("{SIGNATURE_VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a provided signature against the signing secret.
///
/// Rejects timestamps more than [`REPLAY_TOLERANCE_SECS`] away from now,
/// then compares the expected signature in constant time. Neither the
/// provided nor the expected signature is ever logged.
pub fn verify(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    provided: &str,
) -> Result<(), GatewayError> {
    verify_at(signing_secret, timestamp, body, provided, Utc::now().timestamp())
}

/// [`verify`] with an explicit `now`, for deterministic tests.
pub fn verify_at(
    signing_secret: &str,
    timestamp: &str,
    body: &[u8],
    provided: &str,
    now: i64,
) -> Result<(), GatewayError> {
    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| GatewayError::StaleTimestamp)?;

    if (now - ts).abs() > REPLAY_TOLERANCE_SECS {
        return Err(GatewayError::StaleTimestamp);
    }

    let expected = expected_signature(signing_secret, timestamp, body);
    if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
        Ok(())
    } else {
        Err(GatewayError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";

    #[test]
    fn valid_signature_passes() {
        let body = b"command=%2Ftriage&text=plan";
        let timestamp = "1700000000";
        let signature = expected_signature(SECRET, timestamp, body);

        assert!(verify_at(SECRET, timestamp, body, &signature, 1_700_000_010).is_ok());
    }

    #[test]
    fn stale_timestamp_is_rejected_before_signature_check() {
        let body = b"payload";
        let timestamp = "1700000000";
        let signature = expected_signature(SECRET, timestamp, body);

        // 600 seconds later: outside the window even with a valid signature.
        let err = verify_at(SECRET, timestamp, body, &signature, 1_700_000_600).unwrap_err();
        assert!(matches!(err, GatewayError::StaleTimestamp));

        // Future timestamps are equally suspect.
        let err = verify_at(SECRET, timestamp, body, &signature, 1_699_999_000).unwrap_err();
        assert!(matches!(err, GatewayError::StaleTimestamp));
    }

    #[test]
    fn tampered_body_fails() {
        let timestamp = "1700000000";
        let signature = expected_signature(SECRET, timestamp, b"original");

        let err = verify_at(SECRET, timestamp, b"tampered", &signature, 1_700_000_000).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSignature));
    }

    #[test]
    fn wrong_secret_fails() {
        let timestamp = "1700000000";
        let signature = expected_signature("other-secret", timestamp, b"body");

        let err = verify_at(SECRET, timestamp, b"body", &signature, 1_700_000_000).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidSignature));
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        let err = verify_at(SECRET, "not-a-number", b"body", "v0=00", 0).unwrap_err();
        assert!(matches!(err, GatewayError::StaleTimestamp));
    }
}
