//! Error types for payload verification.

use purchasekit_types::StoreError;
use thiserror::Error;

/// Result type for verification operations.
pub type VerifyResult<T> = Result<T, VerifyError>;

/// Why a transaction payload was rejected.
///
/// Callers that only need the shared taxonomy convert with `From`, which
/// collapses every variant into `StoreError::VerificationFailed` — the
/// distinction matters for logs, not for entitlement state.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Payload framing is not `base64url(payload).base64url(signature)`.
    #[error("invalid payload format: {0}")]
    InvalidFormat(String),

    /// Ed25519 signature does not verify against the trust anchor.
    #[error("payload signature invalid")]
    InvalidSignature,

    /// Payload JSON is malformed or missing required fields.
    #[error("invalid payload body: {0}")]
    InvalidPayload(String),

    /// The payload was signed for a different app.
    #[error("bundle identity mismatch: expected {expected}, got {actual}")]
    BundleMismatch {
        /// Bundle id this verifier was configured with.
        expected: String,
        /// Bundle id carried by the payload.
        actual: String,
    },

    /// The payload's signing date is outside the replay tolerance window.
    #[error("payload signed too long ago ({age_secs}s)")]
    StalePayload {
        /// Age of the payload in seconds.
        age_secs: i64,
    },

    /// The payload claims to be signed in the future.
    #[error("payload signed in the future")]
    FutureDated,
}

impl From<VerifyError> for StoreError {
    fn from(_: VerifyError) -> Self {
        StoreError::VerificationFailed
    }
}
