//! Verified transaction records.
//!
//! A `TransactionRecord` is constructed only from a payload that already
//! passed signature verification, and is immutable afterwards. Records are
//! the sole input to entitlement reconciliation.

use crate::{ProductId, TransactionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How the user came to own a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipType {
    /// Purchased directly by this user.
    Purchased,
    /// Shared through family sharing.
    FamilyShared,
}

/// Why a transaction was revoked by the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    /// The user was refunded.
    Refund,
    /// Access was revoked for another reason (e.g. family sharing ended).
    Revoked,
}

/// Storefront-reported status of whether an auto-renewing subscription
/// will continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalState {
    /// The subscription will renew at the end of the current period.
    WillRenew,
    /// Auto-renewal was turned off; the subscription lapses at expiry.
    WillNotRenew,
    /// Billing failed; the storefront is retrying within a grace period.
    InGracePeriod,
}

/// Renewal metadata carried on subscription payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalInfo {
    /// Current renewal state.
    pub state: RenewalState,
    /// True when the current period is a free trial.
    pub is_free_trial: bool,
}

/// One verified record of a purchase, renewal, refund, or revocation
/// event issued by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Unique, monotonically-issued transaction identifier.
    pub transaction_id: TransactionId,

    /// The product this transaction applies to.
    pub product_id: ProductId,

    /// When the purchase happened.
    pub purchase_date: DateTime<Utc>,

    /// When the entitlement expires. Meaningful only for subscriptions.
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,

    /// When the transaction was refunded or revoked, if ever.
    #[serde(default)]
    pub revocation_date: Option<DateTime<Utc>>,

    /// Why the transaction was revoked, when known.
    #[serde(default)]
    pub revocation_reason: Option<RevocationReason>,

    /// Direct purchase or family sharing.
    pub ownership: OwnershipType,

    /// Renewal metadata, present on auto-renewing subscription payloads.
    #[serde(default)]
    pub renewal: Option<RenewalInfo>,
}

impl TransactionRecord {
    /// Creates a directly-purchased record with no expiration and no
    /// revocation.
    #[must_use]
    pub fn new(
        transaction_id: impl Into<TransactionId>,
        product_id: impl Into<ProductId>,
        purchase_date: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            product_id: product_id.into(),
            purchase_date,
            expiration_date: None,
            revocation_date: None,
            revocation_reason: None,
            ownership: OwnershipType::Purchased,
            renewal: None,
        }
    }

    /// Sets the expiration date.
    #[must_use]
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration);
        self
    }

    /// Marks the record as revoked.
    #[must_use]
    pub fn with_revocation(
        mut self,
        revoked_at: DateTime<Utc>,
        reason: RevocationReason,
    ) -> Self {
        self.revocation_date = Some(revoked_at);
        self.revocation_reason = Some(reason);
        self
    }

    /// Sets the ownership type.
    #[must_use]
    pub fn with_ownership(mut self, ownership: OwnershipType) -> Self {
        self.ownership = ownership;
        self
    }

    /// Attaches renewal metadata.
    #[must_use]
    pub fn with_renewal(mut self, renewal: RenewalInfo) -> Self {
        self.renewal = Some(renewal);
        self
    }

    /// Returns true if the storefront refunded or revoked this
    /// transaction. A revoked record can never contribute an active
    /// entitlement.
    #[must_use]
    pub fn is_revoked(&self) -> bool {
        self.revocation_date.is_some()
    }

    /// Recency order used during reconciliation: later purchase date wins,
    /// ties broken by the greater transaction id.
    #[must_use]
    pub fn recency_cmp(&self, other: &Self) -> Ordering {
        match self.purchase_date.cmp(&other.purchase_date) {
            Ordering::Equal => self.transaction_id.cmp(&other.transaction_id),
            other => other,
        }
    }

    /// Returns true if this record supersedes `other` for the same
    /// product.
    #[must_use]
    pub fn supersedes(&self, other: &Self) -> bool {
        self.recency_cmp(other) == Ordering::Greater
    }
}
