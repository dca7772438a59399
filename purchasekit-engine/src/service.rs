//! The store service facade.
//!
//! `StoreService` owns the single critical section every ledger and
//! state-machine mutation goes through. Collaborator calls (catalog
//! fetch, purchase sheet, history fetch) happen outside the lock; only
//! the resulting state changes are applied under it, so a payload is
//! either fully reconciled or not applied at all.

use crate::catalog::Catalog;
use crate::client::{PurchaseReply, StoreClient};
use crate::dispatcher::{Dispatcher, StoreNotification};
use crate::observer::StoreObserver;
use crate::purchase::{PurchaseAttempt, PurchaseTicket, StoreState};
use crate::stream;
use purchasekit_ledger::{EntitlementEntry, EntitlementLedger, EntitlementRules, RestoreOutcome};
use purchasekit_types::{
    ProductDescriptor, ProductId, StoreConfig, StoreError, StoreResult,
};
use purchasekit_verify::TransactionVerifier;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Everything behind the critical section.
pub(crate) struct Inner {
    pub(crate) config: Option<StoreConfig>,
    pub(crate) started: bool,
    pub(crate) catalog: Option<Catalog>,
    pub(crate) ledger: Option<EntitlementLedger>,
    pub(crate) attempt: Option<PurchaseAttempt>,
}

impl Inner {
    fn ensure_ready(&self) -> StoreResult<()> {
        if self.config.is_none() {
            return Err(StoreError::ConfigurationMissing);
        }
        if !self.started {
            return Err(StoreError::ServiceNotStarted);
        }
        Ok(())
    }
}

/// State shared with the stream processor and purchase driver tasks.
pub(crate) struct Shared {
    pub(crate) client: Arc<dyn StoreClient>,
    pub(crate) verifier: TransactionVerifier,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) inner: Mutex<Inner>,
}

/// The purchase core facade consumed by the bridge layer.
pub struct StoreService {
    shared: Arc<Shared>,
    stream_task: StdMutex<Option<JoinHandle<()>>>,
}

impl StoreService {
    /// Creates an unconfigured service over a store client and verifier.
    #[must_use]
    pub fn new(client: Arc<dyn StoreClient>, verifier: TransactionVerifier) -> Self {
        Self {
            shared: Arc::new(Shared {
                client,
                verifier,
                dispatcher: Dispatcher::spawn(),
                inner: Mutex::new(Inner {
                    config: None,
                    started: false,
                    catalog: None,
                    ledger: None,
                    attempt: None,
                }),
            }),
            stream_task: StdMutex::new(None),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Supplies the process-wide configuration. Accepted exactly once;
    /// re-configuration is rejected.
    pub async fn configure(&self, config: StoreConfig) -> StoreResult<()> {
        let mut inner = self.shared.inner.lock().await;
        if inner.config.is_some() {
            return Err(StoreError::UnknownError);
        }
        inner.config = Some(config);
        Ok(())
    }

    /// Starts the service: builds the ledger from the configuration and
    /// begins draining the live transaction feed.
    ///
    /// # Errors
    ///
    /// `ConfigurationMissing` before `configure`, and an error if
    /// already started or if the client cannot hand over its feed.
    pub async fn start(&self) -> StoreResult<()> {
        {
            let mut inner = self.shared.inner.lock().await;
            let config = inner.config.clone().ok_or(StoreError::ConfigurationMissing)?;
            if inner.started {
                return Err(StoreError::UnknownError);
            }
            inner.started = true;
            inner.ledger = Some(EntitlementLedger::new(EntitlementRules::from_config(&config)));
        }

        match self.shared.client.updates().await {
            Ok(updates) => {
                let handle = stream::spawn_update_processor(self.shared.clone(), updates);
                *self.stream_task.lock().unwrap() = Some(handle);
                info!("store service started");
                Ok(())
            }
            Err(error) => {
                let mut inner = self.shared.inner.lock().await;
                inner.started = false;
                inner.ledger = None;
                Err(error)
            }
        }
    }

    /// Stops the service: tears down the stream processor and abandons
    /// any in-flight attempt.
    pub async fn stop(&self) {
        {
            let mut inner = self.shared.inner.lock().await;
            inner.started = false;
            inner.attempt = None;
        }
        if let Some(handle) = self.stream_task.lock().unwrap().take() {
            handle.abort();
        }
        info!("store service stopped");
    }

    /// Registers the observer, silently dropping any previous one.
    pub fn set_observer(&self, observer: Arc<dyn StoreObserver>) {
        self.shared.dispatcher.set_observer(Some(observer));
    }

    /// Clears the observer.
    pub fn clear_observer(&self) {
        self.shared.dispatcher.set_observer(None);
    }

    // ── Catalog ──────────────────────────────────────────────────

    /// Loads the catalog from the storefront and swaps it in atomically.
    /// Emits `products_loaded` on success.
    pub async fn load_catalog(&self) -> StoreResult<Vec<ProductDescriptor>> {
        let config = {
            let inner = self.shared.inner.lock().await;
            inner.ensure_ready()?;
            inner.config.clone().ok_or(StoreError::ConfigurationMissing)?
        };

        let descriptors = self
            .shared
            .client
            .fetch_products(&config.all_product_ids())
            .await?;
        let catalog = Catalog::build(descriptors, &config)?;
        let products = catalog.products().to_vec();

        {
            let mut inner = self.shared.inner.lock().await;
            inner.ensure_ready()?;
            if let Some(ledger) = inner.ledger.as_mut() {
                ledger.set_kinds(catalog.kinds());
            }
            inner.catalog = Some(catalog);
        }

        info!(count = products.len(), "catalog loaded");
        self.shared
            .dispatcher
            .notify(StoreNotification::ProductsLoaded(products.clone()));
        Ok(products)
    }

    /// The currently loaded products, in presentation order.
    pub async fn products(&self) -> StoreResult<Vec<ProductDescriptor>> {
        let inner = self.shared.inner.lock().await;
        inner.ensure_ready()?;
        Ok(inner
            .catalog
            .as_ref()
            .map(|c| c.products().to_vec())
            .unwrap_or_default())
    }

    // ── Purchases ────────────────────────────────────────────────

    /// Starts a purchase attempt for a product.
    ///
    /// Returns as soon as the attempt is in `Purchasing`; the terminal
    /// state is delivered through the returned ticket and the observer,
    /// each exactly once.
    ///
    /// # Errors
    ///
    /// `ConfigurationMissing`/`ServiceNotStarted` before setup,
    /// `PurchaseInProgress` while any other attempt is in flight, and
    /// `ProductNotFound` for products missing from the loaded catalog.
    pub async fn purchase(&self, product: ProductId) -> StoreResult<PurchaseTicket> {
        let attempt = {
            let mut inner = self.shared.inner.lock().await;
            inner.ensure_ready()?;
            if inner.attempt.is_some() {
                return Err(StoreError::PurchaseInProgress);
            }
            let in_catalog = inner
                .catalog
                .as_ref()
                .is_some_and(|c| c.contains(&product));
            if !in_catalog {
                return Err(StoreError::ProductNotFound(product));
            }
            let attempt = PurchaseAttempt::new(product.clone());
            inner.attempt = Some(attempt.clone());
            attempt
        };

        info!(product = %attempt.product_id, attempt = %attempt.attempt_id, "purchase started");
        self.shared
            .dispatcher
            .notify(StoreNotification::StateChanged(StoreState::Purchasing(
                product.clone(),
            )));

        let (tx, rx) = oneshot::channel();
        tokio::spawn(drive_purchase(self.shared.clone(), product.clone(), tx));

        Ok(PurchaseTicket {
            attempt_id: attempt.attempt_id,
            product_id: product,
            outcome: rx,
        })
    }

    /// Returns true while a purchase attempt is in flight.
    pub async fn is_purchasing(&self) -> bool {
        self.shared.inner.lock().await.attempt.is_some()
    }

    /// The current caller-visible state: `Purchasing` while an attempt
    /// is in flight, `Idle` otherwise.
    pub async fn current_state(&self) -> StoreState {
        let inner = self.shared.inner.lock().await;
        match &inner.attempt {
            Some(attempt) => StoreState::Purchasing(attempt.product_id.clone()),
            None => StoreState::Idle,
        }
    }

    // ── Restore ──────────────────────────────────────────────────

    /// Restores entitlements from the full transaction history.
    ///
    /// The whole history is fetched and verified before any of it is
    /// reconciled; a failure in either stage leaves the ledger untouched
    /// and surfaces as `RestorePurchasesFailed` to both the caller and
    /// the observer.
    pub async fn restore_purchases(&self) -> StoreResult<RestoreOutcome> {
        {
            let inner = self.shared.inner.lock().await;
            inner.ensure_ready()?;
        }

        let raws = match self.shared.client.transaction_history().await {
            Ok(raws) => raws,
            Err(error) => {
                return Err(self.restore_failed(error.to_string()));
            }
        };

        let mut records = Vec::with_capacity(raws.len());
        for raw in raws {
            match self.shared.verifier.verify(&raw.signed_payload) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(product = %raw.product_hint, %error, "restore history failed verification");
                    return Err(self.restore_failed(error.to_string()));
                }
            }
        }

        let outcome = {
            let mut inner = self.shared.inner.lock().await;
            inner.ensure_ready()?;
            let ledger = inner.ledger.as_mut().ok_or(StoreError::ServiceNotStarted)?;
            ledger.restore_from_history(records)
        };

        for change in &outcome.changes {
            self.shared
                .dispatcher
                .notify(StoreNotification::UpdateEvent(change.clone()));
        }
        if !(outcome.added.is_empty() && outcome.removed.is_empty()) {
            self.shared
                .dispatcher
                .notify(StoreNotification::EntitlementsChanged {
                    added: outcome.added.clone(),
                    removed: outcome.removed.clone(),
                });
        }

        info!(
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            "restore completed"
        );
        Ok(outcome)
    }

    fn restore_failed(&self, cause: String) -> StoreError {
        let error = StoreError::RestorePurchasesFailed(cause);
        self.shared
            .dispatcher
            .notify(StoreNotification::Error(error.clone()));
        error
    }

    // ── Subscriptions ────────────────────────────────────────────

    /// Asks the storefront to open subscription management for a
    /// product.
    pub async fn cancel_subscription(&self, product: &ProductId) -> StoreResult<()> {
        {
            let inner = self.shared.inner.lock().await;
            inner.ensure_ready()?;
            let in_catalog = inner.catalog.as_ref().is_some_and(|c| c.contains(product));
            if !in_catalog {
                return Err(StoreError::ProductNotFound(product.clone()));
            }
        }

        self.shared
            .client
            .cancel_subscription(product)
            .await
            .map_err(|error| match error {
                StoreError::CancelSubscriptionFailed(_) => error,
                other => StoreError::CancelSubscriptionFailed(other.to_string()),
            })
    }

    // ── Entitlement queries ──────────────────────────────────────

    /// The entitlement entry for a product, if it has purchase history.
    pub async fn entitlement(&self, product: &ProductId) -> StoreResult<Option<EntitlementEntry>> {
        let inner = self.shared.inner.lock().await;
        inner.ensure_ready()?;
        Ok(inner
            .ledger
            .as_ref()
            .and_then(|ledger| ledger.entitlement(product)))
    }

    /// Every product the user is currently entitled to.
    pub async fn active_entitlements(&self) -> StoreResult<BTreeSet<ProductId>> {
        let inner = self.shared.inner.lock().await;
        inner.ensure_ready()?;
        Ok(inner
            .ledger
            .as_ref()
            .map(EntitlementLedger::all_active_entitlements)
            .unwrap_or_default())
    }
}

impl Drop for StoreService {
    fn drop(&mut self) {
        self.shared.dispatcher.shutdown();
        if let Some(handle) = self.stream_task.lock().unwrap().take() {
            handle.abort();
        }
    }
}

/// Drives one purchase attempt to its terminal state.
async fn drive_purchase(
    shared: Arc<Shared>,
    product: ProductId,
    tx: oneshot::Sender<StoreState>,
) {
    let reply = shared.client.purchase(&product).await;

    let terminal = match reply {
        Ok(PurchaseReply::Confirmed(raw)) => {
            match shared.verifier.verify(&raw.signed_payload) {
                Ok(record) => {
                    let (changes, added, removed) = {
                        let mut inner = shared.inner.lock().await;
                        match inner.ledger.as_mut() {
                            Some(ledger) => {
                                let before = ledger.all_active_entitlements();
                                let changes = ledger.reconcile(record);
                                let after = ledger.all_active_entitlements();
                                let (added, removed) = diff_active(&before, &after);
                                (changes, added, removed)
                            }
                            None => (Vec::new(), Vec::new(), Vec::new()),
                        }
                    };
                    for change in changes {
                        shared
                            .dispatcher
                            .notify(StoreNotification::UpdateEvent(change));
                    }
                    if !(added.is_empty() && removed.is_empty()) {
                        shared
                            .dispatcher
                            .notify(StoreNotification::EntitlementsChanged { added, removed });
                    }
                    StoreState::Success(product.clone())
                }
                Err(error) => {
                    // Store-level success never implies user-visible
                    // success without verification.
                    warn!(%product, %error, "confirmed purchase failed verification");
                    StoreState::Failed(product.clone(), StoreError::VerificationFailed)
                }
            }
        }
        Ok(PurchaseReply::Pending) => StoreState::Pending(product.clone()),
        Ok(PurchaseReply::Cancelled) => StoreState::Cancelled(product.clone()),
        Ok(PurchaseReply::Failed(cause)) => StoreState::Failed(
            product.clone(),
            StoreError::PurchaseFailed {
                product: product.clone(),
                cause,
            },
        ),
        Err(error) => StoreState::Failed(
            product.clone(),
            StoreError::PurchaseFailed {
                product: product.clone(),
                cause: error.to_string(),
            },
        ),
    };

    {
        let mut inner = shared.inner.lock().await;
        inner.attempt = None;
    }

    info!(%product, state = ?terminal, "purchase attempt terminated");
    shared
        .dispatcher
        .notify(StoreNotification::StateChanged(terminal.clone()));
    let _ = tx.send(terminal);
}

/// Splits a before/after active-set pair into added and removed lists.
pub(crate) fn diff_active(
    before: &BTreeSet<ProductId>,
    after: &BTreeSet<ProductId>,
) -> (Vec<ProductId>, Vec<ProductId>) {
    let added = after.difference(before).cloned().collect();
    let removed = before.difference(after).cloned().collect();
    (added, removed)
}
