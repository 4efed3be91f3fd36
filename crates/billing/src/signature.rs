//! Webhook signature verification.
//!
//! Stripe signs `"{t}.{payload}"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<ts>,v1=<hex>`; Kiwify sends a plain hex HMAC of
//! the raw body as a `signature` query parameter. Comparisons are
//! constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::BillingError;

/// Tolerated clock skew for the Stripe timestamp, in seconds.
const TIMESTAMP_TOLERANCE_SECS: i64 = 300;

/// Verify a Stripe-style `t=...,v1=...` signature header.
pub fn verify_stripe(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> Result<(), BillingError> {
    let mut timestamp: Option<&str> = None;
    let mut sig_v1: Option<&str> = None;

    for part in header.split(',') {
        if let Some((key, value)) = part.split_once('=') {
            match key.trim() {
                "t" => timestamp = Some(value),
                "v1" => sig_v1 = Some(value),
                _ => {}
            }
        }
    }

    let timestamp = timestamp.ok_or_else(|| BillingError::Signature("missing timestamp".into()))?;
    let sig_v1 = sig_v1.ok_or_else(|| BillingError::Signature("missing v1 signature".into()))?;

    let mut signed_payload = Vec::with_capacity(timestamp.len() + 1 + payload.len());
    signed_payload.extend_from_slice(timestamp.as_bytes());
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    let expected = hmac_hex(secret, &signed_payload)?;
    if !constant_time_eq(sig_v1.as_bytes(), expected.as_bytes()) {
        return Err(BillingError::Signature("signature mismatch".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| BillingError::Signature("invalid timestamp".into()))?;
    if (now_unix - ts).abs() > TIMESTAMP_TOLERANCE_SECS {
        return Err(BillingError::Signature("timestamp outside tolerance".into()));
    }

    Ok(())
}

/// Verify a plain hex HMAC-SHA256 of the raw body (Kiwify scheme).
pub fn verify_hex_hmac(payload: &[u8], signature: &str, secret: &str) -> Result<(), BillingError> {
    let expected = hmac_hex(secret, payload)?;
    if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
        return Err(BillingError::Signature("signature mismatch".into()));
    }
    Ok(())
}

fn hmac_hex(secret: &str, data: &[u8]) -> Result<String, BillingError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| BillingError::Signature("invalid secret".into()))?;
    mac.update(data);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";

    fn sign_stripe(payload: &[u8], ts: i64) -> String {
        let mut signed = format!("{ts}.").into_bytes();
        signed.extend_from_slice(payload);
        format!("t={ts},v1={}", hmac_hex(SECRET, &signed).unwrap())
    }

    #[test]
    fn valid_stripe_signature_passes() {
        let payload = br#"{"type":"invoice.paid"}"#;
        let header = sign_stripe(payload, 1_700_000_000);
        assert!(verify_stripe(payload, &header, SECRET, 1_700_000_000).is_ok());
    }

    #[test]
    fn tampered_payload_fails() {
        let header = sign_stripe(br#"{"a":1}"#, 1_700_000_000);
        assert!(verify_stripe(br#"{"a":2}"#, &header, SECRET, 1_700_000_000).is_err());
    }

    #[test]
    fn stale_timestamp_fails() {
        let payload = b"{}";
        let header = sign_stripe(payload, 1_700_000_000);
        assert!(verify_stripe(payload, &header, SECRET, 1_700_000_000 + 301).is_err());
    }

    #[test]
    fn hex_hmac_round_trip() {
        let payload = b"kiwify body";
        let sig = hmac_hex(SECRET, payload).unwrap();
        assert!(verify_hex_hmac(payload, &sig, SECRET).is_ok());
        assert!(verify_hex_hmac(payload, &sig, "other_secret").is_err());
    }
}
