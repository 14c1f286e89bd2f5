//! Payment webhook signature verification.
//!
//! The processor signs each webhook delivery with a header of the form
//! `t=<unix-seconds>,v1=<hex hmac>[,v1=<hex hmac>...]` where the HMAC-SHA256
//! is computed over `"{t}.{raw body}"` with the endpoint's signing secret.
//! Several `v1` entries may be present while a secret is being rolled.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum age of a signed delivery before it is rejected as a replay.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Checkout session event types the storefront reacts to.
pub mod events {
    pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";
    pub const CHECKOUT_ASYNC_SUCCEEDED: &str = "checkout.session.async_payment_succeeded";
    pub const CHECKOUT_ASYNC_FAILED: &str = "checkout.session.async_payment_failed";
    pub const CHECKOUT_EXPIRED: &str = "checkout.session.expired";
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header has no timestamp")]
    MissingTimestamp,

    #[error("Signature header has no v1 signature")]
    MissingSignature,

    #[error("Signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,

    #[error("No signature matches the expected signature for the payload")]
    SignatureMismatch,
}

fn compute_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    let bytes = mac.finalize().into_bytes();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Compare two strings without short-circuiting on the first difference.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Build a signature header for `payload`. Used by tests and local tooling.
pub fn sign_webhook_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    format!(
        "t={timestamp},v1={}",
        compute_signature(payload, secret, timestamp)
    )
}

/// Verify a webhook delivery.
///
/// `now` is the current Unix time in seconds; deliveries whose timestamp is
/// further than `tolerance_secs` from it are rejected.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    let skew = now.checked_sub(timestamp).map(i64::unsigned_abs);
    if skew.map_or(true, |skew| skew > tolerance_secs.unsigned_abs()) {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let expected = compute_signature(payload, secret, timestamp);
    if signatures.iter().any(|sig| constant_time_eq(sig, &expected)) {
        Ok(())
    } else {
        Err(SignatureError::SignatureMismatch)
    }
}
