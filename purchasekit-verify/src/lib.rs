//! Signed transaction verification for PurchaseKit.
//!
//! This crate is the trust boundary of the purchase core. Raw payloads
//! from the storefront — live updates, purchase confirmations, restore
//! history — all pass through `TransactionVerifier::verify` before they
//! can influence entitlement state, on every code path.
//!
//! # Payload Format
//!
//! Payloads are formatted as: `base64url(payload).base64url(signature)`
//! The payload is a JSON object signed with Ed25519, carrying the
//! transaction id, product id, bundle identity, purchase/expiration/
//! revocation dates, ownership, renewal metadata, and signing date.

mod error;
mod payload;
mod verifier;

pub use error::{VerifyError, VerifyResult};
pub use payload::{PayloadRenewal, TransactionPayload};
pub use verifier::{
    TransactionVerifier, DEFAULT_REPLAY_TOLERANCE_SECS, MAX_CLOCK_SKEW_SECS,
};
