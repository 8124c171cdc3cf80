//! HMAC-SHA256 signatures for the two payment reconciliation paths.
//!
//! The gateway signs two different things with two different secrets:
//! * the synchronous proof of payment the customer's client submits after paying, over the message
//!   `"{intent_id}|{gateway_payment_id}"`, signed with the API key secret;
//! * the raw body of every webhook delivery, signed with the webhook secret.
//!
//! Both signatures arrive as lowercase hex digests and are recomputed locally for comparison. Verification never
//! mutates anything; recording the outcome is the caller's job.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256_hex(secret: &str, data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks the proof of payment submitted on the synchronous verification path.
pub fn verify_payment_signature(secret: &str, intent_id: &str, gateway_payment_id: &str, signature: &str) -> bool {
    let message = format!("{intent_id}|{gateway_payment_id}");
    hmac_sha256_hex(secret, message.as_bytes()) == signature
}

/// Checks the signature header of a webhook delivery against the raw request body.
pub fn verify_webhook_signature(secret: &str, raw_body: &[u8], signature: &str) -> bool {
    hmac_sha256_hex(secret, raw_body) == signature
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn a_correctly_signed_proof_verifies() {
        let signature = hmac_sha256_hex("s3cret", b"intent_123|pay_456");
        assert!(verify_payment_signature("s3cret", "intent_123", "pay_456", &signature));
    }

    #[test]
    fn the_message_binds_both_identifiers() {
        let signature = hmac_sha256_hex("s3cret", b"intent_123|pay_456");
        assert!(!verify_payment_signature("s3cret", "intent_123", "pay_999", &signature));
        assert!(!verify_payment_signature("s3cret", "intent_999", "pay_456", &signature));
    }

    #[test]
    fn the_secret_matters() {
        let signature = hmac_sha256_hex("s3cret", b"intent_123|pay_456");
        assert!(!verify_payment_signature("other", "intent_123", "pay_456", &signature));
    }

    #[test]
    fn webhook_signature_covers_the_raw_body() {
        let body = br#"{"event":"payment.captured"}"#;
        let signature = hmac_sha256_hex("hook-secret", body);
        assert!(verify_webhook_signature("hook-secret", body, &signature));
        assert!(!verify_webhook_signature("hook-secret", br#"{"event":"payment.failed"}"#, &signature));
    }

    #[test]
    fn digests_are_lowercase_hex() {
        let digest = hmac_sha256_hex("k", b"data");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
