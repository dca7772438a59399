//! Entitlement entries.
//!
//! One entry exists per product with purchase history. Entries are
//! produced by the ledger's reconciliation step; callers never mutate
//! them directly, and `is_active` is always derived, never set.

use purchasekit_types::{ProductId, TransactionId};
use serde::{Deserialize, Serialize};

/// The derived entitlement state for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementEntry {
    /// The product this entry describes.
    pub product_id: ProductId,

    /// Whether the user currently has rights to the product's content.
    pub is_active: bool,

    /// The transaction that originally established the purchase history
    /// for this product. Back-reference for lookup only.
    pub source_transaction_id: TransactionId,

    /// The transaction with the greatest purchase date seen so far
    /// (ties broken by transaction id).
    pub latest_transaction_id: TransactionId,

    /// True when the latest transaction came through family sharing.
    pub family_shared: bool,
}
