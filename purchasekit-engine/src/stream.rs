//! The update stream processor.
//!
//! Runs for the process lifetime once the service starts, draining the
//! storefront's live transaction feed. Each payload is verified, then
//! reconciled atomically under the core critical section. An
//! unverifiable payload is dropped with a non-fatal notification — one
//! bad payload never stops the stream.

use crate::client::RawTransaction;
use crate::dispatcher::StoreNotification;
use crate::service::{diff_active, Shared};
use purchasekit_types::StoreError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawns the processor task over the client's update feed. The task
/// ends when the feed closes or the service is stopped.
pub(crate) fn spawn_update_processor(
    shared: Arc<Shared>,
    mut updates: mpsc::Receiver<RawTransaction>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("update stream processor running");
        while let Some(raw) = updates.recv().await {
            process_payload(&shared, raw).await;
        }
        debug!("update stream closed");
    })
}

async fn process_payload(shared: &Shared, raw: RawTransaction) {
    let record = match shared.verifier.verify(&raw.signed_payload) {
        Ok(record) => record,
        Err(error) => {
            warn!(product = %raw.product_hint, %error, "dropping unverifiable payload");
            shared
                .dispatcher
                .notify(StoreNotification::Error(StoreError::VerificationFailed));
            return;
        }
    };

    let mut inner = shared.inner.lock().await;
    let Some(ledger) = inner.ledger.as_mut() else {
        return;
    };
    let before = ledger.all_active_entitlements();
    let changes = ledger.reconcile(record);
    let after = ledger.all_active_entitlements();
    drop(inner);

    for change in changes {
        shared
            .dispatcher
            .notify(StoreNotification::UpdateEvent(change));
    }
    let (added, removed) = diff_active(&before, &after);
    if !(added.is_empty() && removed.is_empty()) {
        shared
            .dispatcher
            .notify(StoreNotification::EntitlementsChanged { added, removed });
    }
}
