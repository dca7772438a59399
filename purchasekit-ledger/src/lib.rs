//! Entitlement ledger for PurchaseKit.
//!
//! The ledger answers one question: what is the user entitled to right
//! now. It is fed exclusively by verified transaction records and is
//! rebuilt or updated through a single reconciliation rule, so live
//! updates, explicit purchases, and history restores all converge on the
//! same state.
//!
//! Reconciliation is:
//! - **Idempotent**: the same transaction id applies once.
//! - **Commutative**: the record with the greatest purchase date wins
//!   (ties broken by transaction id), not the last call.
//! - **Revocation-dominant**: a revoked record never yields an active
//!   entitlement.

mod change;
mod entry;
mod ledger;
mod rules;

pub use change::EntitlementChange;
pub use entry::EntitlementEntry;
pub use ledger::{EntitlementLedger, RestoreOutcome};
pub use rules::EntitlementRules;
