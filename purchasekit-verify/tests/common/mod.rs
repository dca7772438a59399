//! Shared test helpers for verifier tests.

#![allow(dead_code)]

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signer, SigningKey};

/// Bundle identity used throughout the tests.
pub const TEST_BUNDLE: &str = "com.example.melody";

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        9, 8, 7, 6, 5, 4, 3, 2, 1, 0, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24,
        25, 26, 27, 28, 29, 30, 31, 32,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// Creates a signed payload string: `base64url(payload_json).base64url(signature)`.
/// Signs over the base64url-encoded payload bytes (matching the storefront).
pub fn sign_payload(signing_key: &SigningKey, payload_json: &str) -> String {
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
    let signature = signing_key.sign(payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    format!("{payload_b64}.{sig_b64}")
}

/// Creates a minimal signed payload for a direct purchase signed now.
pub fn make_purchase_payload(signing_key: &SigningKey, tid: u64, product: &str) -> String {
    let now_ms = chrono::Utc::now().timestamp_millis();
    let payload = format!(
        r#"{{"tid":{tid},"product":"{product}","bundle":"{TEST_BUNDLE}","purchased_at":{now_ms},"signed_at":{now_ms}}}"#
    );
    sign_payload(signing_key, &payload)
}

/// Creates a signed payload with an explicit signing date.
pub fn make_payload_signed_at(
    signing_key: &SigningKey,
    tid: u64,
    product: &str,
    signed_at_ms: i64,
) -> String {
    let payload = format!(
        r#"{{"tid":{tid},"product":"{product}","bundle":"{TEST_BUNDLE}","purchased_at":{signed_at_ms},"signed_at":{signed_at_ms}}}"#
    );
    sign_payload(signing_key, &payload)
}
