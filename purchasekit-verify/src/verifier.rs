//! Signed payload parsing and Ed25519 signature verification.
//!
//! Payloads use the format: `base64url(payload).base64url(signature)`
//!
//! The signature covers `payload_b64.as_bytes()` (the base64url-encoded
//! payload string, not the decoded JSON), matching the storefront's
//! signing service. Verification checks, in order:
//! 1. framing and signature against the trust-anchor public key
//! 2. bundle identity against the running app
//! 3. signing-date freshness within the replay tolerance window
//!
//! Nothing that fails any of these checks leaves this module. The ledger
//! only ever sees records produced by `verify`.

use crate::error::{VerifyError, VerifyResult};
use crate::payload::TransactionPayload;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use purchasekit_types::TransactionRecord;

/// Default replay tolerance (7 days).
pub const DEFAULT_REPLAY_TOLERANCE_SECS: i64 = 7 * 24 * 60 * 60;

/// Allowed forward clock skew for `signed_at` (5 minutes).
pub const MAX_CLOCK_SKEW_SECS: i64 = 5 * 60;

/// Embedded Ed25519 public key of the storefront trust anchor (32 bytes).
const STORE_ROOT_PUBLIC_KEY: [u8; 32] = [
    0x58, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
    0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66, 0x66,
    0x66, 0x66,
];

/// Verifies raw signed transaction payloads against the storefront trust
/// anchor and the running app's identity.
#[derive(Debug, Clone)]
pub struct TransactionVerifier {
    verifying_key: VerifyingKey,
    bundle_id: String,
    replay_tolerance: Duration,
}

impl TransactionVerifier {
    /// Creates a verifier for the given bundle identity using the
    /// embedded production trust anchor.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded key is malformed.
    pub fn new(bundle_id: impl Into<String>) -> VerifyResult<Self> {
        Self::with_key(bundle_id, &STORE_ROOT_PUBLIC_KEY)
    }

    /// Creates a verifier with a custom trust-anchor public key.
    /// Used for testing with a generated key pair.
    pub fn with_key(bundle_id: impl Into<String>, pub_key_bytes: &[u8; 32]) -> VerifyResult<Self> {
        let verifying_key = VerifyingKey::from_bytes(pub_key_bytes)
            .map_err(|_| VerifyError::InvalidFormat("invalid public key".to_string()))?;
        Ok(Self {
            verifying_key,
            bundle_id: bundle_id.into(),
            replay_tolerance: Duration::seconds(DEFAULT_REPLAY_TOLERANCE_SECS),
        })
    }

    /// Overrides the replay tolerance window.
    #[must_use]
    pub fn with_replay_tolerance(mut self, tolerance: Duration) -> Self {
        self.replay_tolerance = tolerance;
        self
    }

    /// Returns the bundle identity this verifier accepts.
    #[must_use]
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    /// Verifies a raw signed payload and produces a transaction record.
    ///
    /// # Errors
    ///
    /// Returns an error if framing, signature, payload JSON, bundle
    /// identity, or signing-date freshness fails. The payload is
    /// discarded; it must never reach the ledger.
    pub fn verify(&self, raw: &str) -> VerifyResult<TransactionRecord> {
        let raw = raw.trim();

        // Split into payload and signature parts
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 2 {
            return Err(VerifyError::InvalidFormat(
                "payload must have exactly two parts separated by a dot".to_string(),
            ));
        }

        let payload_b64 = parts[0];
        let signature_b64 = parts[1];

        // Decode signature
        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| VerifyError::InvalidFormat(format!("invalid signature base64: {e}")))?;

        let signature = Signature::from_slice(&sig_bytes)
            .map_err(|_| VerifyError::InvalidFormat("invalid signature length".to_string()))?;

        // Verify signature over the base64url-encoded payload bytes
        self.verifying_key
            .verify(payload_b64.as_bytes(), &signature)
            .map_err(|_| VerifyError::InvalidSignature)?;

        // Decode payload JSON
        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| VerifyError::InvalidFormat(format!("invalid payload base64: {e}")))?;

        let payload: TransactionPayload = serde_json::from_slice(&payload_json)
            .map_err(|e| VerifyError::InvalidPayload(format!("invalid payload JSON: {e}")))?;

        // Bundle identity must match the running app
        if payload.bundle != self.bundle_id {
            return Err(VerifyError::BundleMismatch {
                expected: self.bundle_id.clone(),
                actual: payload.bundle,
            });
        }

        // Signing-date freshness for replay protection
        let now_ms = Utc::now().timestamp_millis();
        let age_secs = (now_ms - payload.signed_at) / 1000;
        if age_secs > self.replay_tolerance.num_seconds() {
            return Err(VerifyError::StalePayload { age_secs });
        }
        if age_secs < -MAX_CLOCK_SKEW_SECS {
            return Err(VerifyError::FutureDated);
        }

        payload.into_record()
    }
}
