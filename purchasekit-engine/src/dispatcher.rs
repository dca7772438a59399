//! Serialized notification dispatch.
//!
//! All outbound notifications funnel through one channel consumed by a
//! single task, so the observer never receives two notifications
//! concurrently or out of the order they were produced. Observer
//! replacement travels the same channel, which means a replaced observer
//! is never notified after its replacement was registered.

use crate::observer::StoreObserver;
use crate::purchase::StoreState;
use purchasekit_ledger::EntitlementChange;
use purchasekit_types::{ProductDescriptor, ProductId, StoreError};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// One outbound notification.
#[derive(Debug, Clone)]
pub enum StoreNotification {
    /// A purchase attempt changed state.
    StateChanged(StoreState),
    /// A catalog load completed.
    ProductsLoaded(Vec<ProductDescriptor>),
    /// The set of active entitlements changed.
    EntitlementsChanged {
        /// Products that became active.
        added: Vec<ProductId>,
        /// Products that stopped being active.
        removed: Vec<ProductId>,
    },
    /// A classified entitlement change.
    UpdateEvent(EntitlementChange),
    /// A recovered or terminal error surfaced to the observer.
    Error(StoreError),
}

enum DispatchMessage {
    Notify(StoreNotification),
    SetObserver(Option<Arc<dyn StoreObserver>>),
}

/// Owns the single observer slot and delivers notifications in order.
pub(crate) struct Dispatcher {
    tx: mpsc::UnboundedSender<DispatchMessage>,
    task: JoinHandle<()>,
}

impl Dispatcher {
    /// Spawns the dispatch task with no observer registered.
    pub(crate) fn spawn() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            let mut observer: Option<Arc<dyn StoreObserver>> = None;
            while let Some(message) = rx.recv().await {
                match message {
                    DispatchMessage::SetObserver(next) => {
                        // The previous observer is dropped silently; no
                        // queue is retained for a missing observer.
                        observer = next;
                    }
                    DispatchMessage::Notify(notification) => {
                        if let Some(observer) = &observer {
                            deliver(observer.as_ref(), notification).await;
                        }
                    }
                }
            }
            debug!("dispatcher channel closed");
        });
        Self { tx, task }
    }

    /// Registers or clears the observer.
    pub(crate) fn set_observer(&self, observer: Option<Arc<dyn StoreObserver>>) {
        let _ = self.tx.send(DispatchMessage::SetObserver(observer));
    }

    /// Enqueues a notification for in-order delivery.
    pub(crate) fn notify(&self, notification: StoreNotification) {
        let _ = self.tx.send(DispatchMessage::Notify(notification));
    }

    /// Stops the dispatch task.
    pub(crate) fn shutdown(&self) {
        self.task.abort();
    }
}

async fn deliver(observer: &dyn StoreObserver, notification: StoreNotification) {
    match notification {
        StoreNotification::StateChanged(state) => observer.state_changed(state).await,
        StoreNotification::ProductsLoaded(products) => {
            observer.products_loaded(products).await;
        }
        StoreNotification::EntitlementsChanged { added, removed } => {
            observer.entitlements_changed(added, removed).await;
        }
        StoreNotification::UpdateEvent(change) => observer.update_event(change).await,
        StoreNotification::Error(error) => observer.error(error).await,
    }
}
