//! Classified entitlement changes.
//!
//! The ledger describes every observable transition as one of these
//! changes, whether it came from a live update or a restore replay, so
//! observers see identical granular notifications on both paths.

use purchasekit_types::{ProductId, RenewalState};
use serde::{Deserialize, Serialize};

/// One observable change to a product's entitlement state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntitlementChange {
    /// The product became active.
    PurchaseSucceeded {
        /// The affected product.
        product: ProductId,
    },

    /// The storefront refunded the purchase.
    PurchaseRefunded {
        /// The affected product.
        product: ProductId,
    },

    /// Access was revoked (e.g. family sharing ended).
    PurchaseRevoked {
        /// The affected product.
        product: ProductId,
    },

    /// Auto-renewal was turned off for a subscription.
    SubscriptionCancelled {
        /// The affected product.
        product: ProductId,
        /// True when the cancelled period was a free trial.
        is_free_trial: bool,
    },

    /// The storefront reported a new renewal state.
    SubscriptionStatusChanged {
        /// The affected product.
        product: ProductId,
        /// The new renewal state.
        state: RenewalState,
    },
}

impl EntitlementChange {
    /// The product this change applies to.
    #[must_use]
    pub fn product(&self) -> &ProductId {
        match self {
            Self::PurchaseSucceeded { product }
            | Self::PurchaseRefunded { product }
            | Self::PurchaseRevoked { product }
            | Self::SubscriptionCancelled { product, .. }
            | Self::SubscriptionStatusChanged { product, .. } => product,
        }
    }
}
