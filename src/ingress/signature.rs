//! Webhook request authentication.
//!
//! Slack signs each webhook delivery with an HMAC-SHA256 over
//! `v0:<timestamp>:<raw-body>` keyed by the signing secret. Verification must
//! happen before the body is interpreted as anything structured: an
//! attacker-controlled payload is never parsed unauthenticated.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::base::types::EventError;

type HmacSha256 = Hmac<Sha256>;

/// The signature scheme version prefix Slack currently uses.
const SIGNATURE_VERSION: &str = "v0";

/// Validates authenticity and freshness of inbound webhook requests.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verify a request against the current wall clock.
    pub fn verify(&self, body: &[u8], signature: &str, timestamp: &str) -> Result<(), EventError> {
        self.verify_at(body, signature, timestamp, chrono::Utc::now().timestamp())
    }

    /// Verify a request at an explicit point in time.
    ///
    /// Rejects when the timestamp deviates from `now` by more than the
    /// tolerance, when the signature header is malformed, or when the keyed
    /// hash does not match. The comparison is constant time via
    /// [`Mac::verify_slice`].
    pub fn verify_at(&self, body: &[u8], signature: &str, timestamp: &str, now: i64) -> Result<(), EventError> {
        let ts: i64 = timestamp.parse().map_err(|_| EventError::Unauthorized)?;

        if (now - ts).abs() > self.tolerance_secs {
            return Err(EventError::Unauthorized);
        }

        let claimed = signature
            .strip_prefix(&format!("{SIGNATURE_VERSION}="))
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(EventError::Unauthorized)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).map_err(|_| EventError::Unauthorized)?;
        mac.update(format!("{SIGNATURE_VERSION}:{timestamp}:").as_bytes());
        mac.update(body);

        mac.verify_slice(&claimed).map_err(|_| EventError::Unauthorized)
    }

    /// Produce the signature header value for a body and timestamp.
    ///
    /// The inverse of `verify`; used by tests to build authentic requests.
    pub fn sign(&self, body: &[u8], timestamp: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key length");
        mac.update(format!("{SIGNATURE_VERSION}:{timestamp}:").as_bytes());
        mac.update(body);

        format!("{SIGNATURE_VERSION}={}", hex::encode(mac.finalize().into_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const BODY: &[u8] = br#"{"type":"event_callback"}"#;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SECRET, 300)
    }

    #[test]
    fn accepts_valid_signature_within_tolerance() {
        let v = verifier();
        let sig = v.sign(BODY, "1000000");

        assert!(v.verify_at(BODY, &sig, "1000000", 1000060).is_ok());
    }

    #[test]
    fn rejects_single_bit_mutation() {
        let v = verifier();
        let sig = v.sign(BODY, "1000000");

        // Flip one bit in the last hex nibble.
        let mut bytes = sig.into_bytes();
        let last = *bytes.last().unwrap();
        *bytes.last_mut().unwrap() = if last == b'0' { b'1' } else { b'0' };
        let mutated = String::from_utf8(bytes).unwrap();

        assert!(v.verify_at(BODY, &mutated, "1000000", 1000060).is_err());
    }

    #[test]
    fn rejects_stale_timestamp_even_with_correct_signature() {
        let v = verifier();
        let sig = v.sign(BODY, "1000000");

        assert!(v.verify_at(BODY, &sig, "1000000", 1000301).is_err());
    }

    #[test]
    fn rejects_future_timestamp_past_tolerance() {
        let v = verifier();
        let sig = v.sign(BODY, "1000400");

        assert!(v.verify_at(BODY, &sig, "1000400", 1000000).is_err());
    }

    #[test]
    fn rejects_malformed_signature_header() {
        let v = verifier();

        assert!(v.verify_at(BODY, "not-a-signature", "1000000", 1000000).is_err());
        assert!(v.verify_at(BODY, "v0=zzzz", "1000000", 1000000).is_err());
        assert!(v.verify_at(BODY, "", "1000000", 1000000).is_err());
    }

    #[test]
    fn rejects_non_numeric_timestamp() {
        let v = verifier();
        let sig = v.sign(BODY, "1000000");

        assert!(v.verify_at(BODY, &sig, "yesterday", 1000000).is_err());
    }

    #[test]
    fn rejects_signature_for_different_body() {
        let v = verifier();
        let sig = v.sign(b"other body", "1000000");

        assert!(v.verify_at(BODY, &sig, "1000000", 1000000).is_err());
    }
}
