//! The outbound observer interface.
//!
//! Every operation has a default no-op implementation, so an observer
//! opts into exactly the notifications it cares about.

use crate::purchase::StoreState;
use async_trait::async_trait;
use purchasekit_ledger::EntitlementChange;
use purchasekit_types::{ProductDescriptor, ProductId, StoreError};

/// Receiver of store notifications.
///
/// At most one observer is registered at a time; registering a new one
/// drops the previous observer silently. Notifications arrive strictly
/// serialized, in production order.
#[async_trait]
pub trait StoreObserver: Send + Sync {
    /// A purchase attempt changed state.
    async fn state_changed(&self, _state: StoreState) {}

    /// A catalog load completed.
    async fn products_loaded(&self, _products: Vec<ProductDescriptor>) {}

    /// The set of active entitlements changed.
    async fn entitlements_changed(&self, _added: Vec<ProductId>, _removed: Vec<ProductId>) {}

    /// A classified change observed on the transaction feed or during a
    /// restore.
    async fn update_event(&self, _change: EntitlementChange) {}

    /// A recovered, non-fatal error (e.g. an unverifiable payload on the
    /// live stream) or a terminal restore failure.
    async fn error(&self, _error: StoreError) {}
}
