//! Security utilities for webhook signature verification and payload signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signs a payload using HMAC-SHA256, hex encoded.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex HMAC-SHA256 signature using constant-time comparison.
pub fn verify_payload_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let expected = sign_payload(payload, secret);
    expected
        .as_bytes()
        .ct_eq(signature.trim().to_ascii_lowercase().as_bytes())
        .into()
}

/// Builds the manifest MercadoPago signs for a webhook delivery.
///
/// Parts whose value is absent are left out of the manifest. Alphanumeric
/// ids are lowercased before signing.
pub fn mercadopago_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        let id = if id.chars().all(|c| c.is_ascii_alphanumeric()) {
            id.to_ascii_lowercase()
        } else {
            id.to_string()
        };
        manifest.push_str(&format!("id:{id};"));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{request_id};"));
    }
    manifest.push_str(&format!("ts:{ts};"));
    manifest
}

/// Verifies an `x-signature` header of the form `ts=<ts>,v1=<hex>`.
pub fn verify_mercadopago_signature(
    x_signature: &str,
    request_id: Option<&str>,
    data_id: Option<&str>,
    secret: &str,
) -> bool {
    let mut ts = None;
    let mut v1 = None;
    for part in x_signature.split(',') {
        match part.trim().split_once('=') {
            Some(("ts", value)) => ts = Some(value.trim()),
            Some(("v1", value)) => v1 = Some(value.trim()),
            _ => {}
        }
    }

    let (Some(ts), Some(v1)) = (ts, v1) else {
        return false;
    };

    let manifest = mercadopago_manifest(data_id, request_id, ts);
    verify_payload_signature(manifest.as_bytes(), v1, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_signing() {
        let payload = br#"{"id":"123","status":"approved"}"#;
        let secret = "fulfillment_secret";

        let signature = sign_payload(payload, secret);
        assert_eq!(signature.len(), 64);
        assert!(verify_payload_signature(payload, &signature, secret));
        assert!(!verify_payload_signature(payload, &signature, "wrong"));
        assert!(!verify_payload_signature(b"tampered", &signature, secret));
    }

    #[test]
    fn test_manifest_layout() {
        assert_eq!(
            mercadopago_manifest(Some("ABC123"), Some("req-1"), "1704908010"),
            "id:abc123;request-id:req-1;ts:1704908010;"
        );
        assert_eq!(
            mercadopago_manifest(None, None, "1704908010"),
            "ts:1704908010;"
        );
    }

    #[test]
    fn test_mercadopago_signature_roundtrip() {
        let secret = "webhook-secret";
        let manifest = mercadopago_manifest(Some("123"), Some("req-9"), "1700000000");
        let v1 = sign_payload(manifest.as_bytes(), secret);
        let header = format!("ts=1700000000,v1={v1}");

        assert!(verify_mercadopago_signature(
            &header,
            Some("req-9"),
            Some("123"),
            secret
        ));
        assert!(!verify_mercadopago_signature(
            &header,
            Some("req-9"),
            Some("124"),
            secret
        ));
        assert!(!verify_mercadopago_signature(
            &header,
            Some("req-9"),
            Some("123"),
            "other-secret"
        ));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(!verify_mercadopago_signature("garbage", None, Some("1"), "s"));
        assert!(!verify_mercadopago_signature("ts=1", None, Some("1"), "s"));
    }
}
