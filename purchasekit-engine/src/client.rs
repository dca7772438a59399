//! Store client abstraction.
//!
//! The platform storefront is an external collaborator. The core only
//! needs these operations; connectivity, timeouts, and payload signing
//! are the collaborator's concern. A collaborator reporting failure maps
//! its cause into the shared taxonomy.

use async_trait::async_trait;
use purchasekit_types::{ProductDescriptor, ProductId, StoreResult};
use tokio::sync::mpsc;

/// A raw transaction as delivered by the storefront: an opaque signed
/// payload plus a product hint for logging. Nothing in the hint is
/// trusted; only the verified payload contents matter.
#[derive(Debug, Clone)]
pub struct RawTransaction {
    /// Unverified product hint, for diagnostics only.
    pub product_hint: ProductId,
    /// The opaque signed payload.
    pub signed_payload: String,
}

impl RawTransaction {
    /// Creates a raw transaction.
    #[must_use]
    pub fn new(product_hint: impl Into<ProductId>, signed_payload: impl Into<String>) -> Self {
        Self {
            product_hint: product_hint.into(),
            signed_payload: signed_payload.into(),
        }
    }
}

/// What the storefront reported for a purchase request.
#[derive(Debug, Clone)]
pub enum PurchaseReply {
    /// The purchase went through; the signed transaction is attached.
    Confirmed(RawTransaction),
    /// Deferred pending approval (ask-to-buy). No transaction yet.
    Pending,
    /// The user dismissed the purchase UI. Not an error.
    Cancelled,
    /// Any other store-reported failure.
    Failed(String),
}

/// The storefront collaborator.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetches descriptors for the given product ids. Ids the store does
    /// not know are simply absent from the response.
    async fn fetch_products(&self, ids: &[ProductId]) -> StoreResult<Vec<ProductDescriptor>>;

    /// Presents the purchase flow for one product and reports the
    /// outcome.
    async fn purchase(&self, product: &ProductId) -> StoreResult<PurchaseReply>;

    /// Fetches the full transaction history for restore.
    async fn transaction_history(&self) -> StoreResult<Vec<RawTransaction>>;

    /// Hands over the live update feed. Called once at service start.
    async fn updates(&self) -> StoreResult<mpsc::Receiver<RawTransaction>>;

    /// Initiates subscription cancellation management for a product.
    async fn cancel_subscription(&self, product: &ProductId) -> StoreResult<()>;
}

/// A mock store client for testing.
pub mod mock {
    use super::*;
    use purchasekit_types::StoreError;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// A scriptable in-memory store client.
    ///
    /// Purchase replies are consumed front-to-back; an empty queue
    /// reports a store failure. The purchase gate lets tests hold a
    /// purchase in flight: take the gate lock, start the purchase, and
    /// release when ready.
    pub struct MockStoreClient {
        products: Mutex<Vec<ProductDescriptor>>,
        purchase_replies: Mutex<VecDeque<StoreResult<PurchaseReply>>>,
        history: Mutex<StoreResult<Vec<RawTransaction>>>,
        updates_tx: Mutex<Option<mpsc::Sender<RawTransaction>>>,
        updates_rx: Mutex<Option<mpsc::Receiver<RawTransaction>>>,
        cancel_reply: Mutex<StoreResult<()>>,
        gate: Arc<tokio::sync::Mutex<()>>,
    }

    impl MockStoreClient {
        /// Creates a mock with no products and an open update feed.
        #[must_use]
        pub fn new() -> Self {
            let (tx, rx) = mpsc::channel(32);
            Self {
                products: Mutex::new(Vec::new()),
                purchase_replies: Mutex::new(VecDeque::new()),
                history: Mutex::new(Ok(Vec::new())),
                updates_tx: Mutex::new(Some(tx)),
                updates_rx: Mutex::new(Some(rx)),
                cancel_reply: Mutex::new(Ok(())),
                gate: Arc::new(tokio::sync::Mutex::new(())),
            }
        }

        /// Sets the catalog response.
        pub fn set_products(&self, products: Vec<ProductDescriptor>) {
            *self.products.lock().unwrap() = products;
        }

        /// Queues the reply for the next purchase call.
        pub fn queue_purchase_reply(&self, reply: StoreResult<PurchaseReply>) {
            self.purchase_replies.lock().unwrap().push_back(reply);
        }

        /// Sets the restore history response.
        pub fn set_history(&self, history: StoreResult<Vec<RawTransaction>>) {
            *self.history.lock().unwrap() = history;
        }

        /// Sets the cancel-subscription response.
        pub fn set_cancel_reply(&self, reply: StoreResult<()>) {
            *self.cancel_reply.lock().unwrap() = reply;
        }

        /// Pushes a raw transaction onto the live update feed.
        pub async fn push_update(&self, raw: RawTransaction) {
            let tx = self.updates_tx.lock().unwrap().clone();
            if let Some(tx) = tx {
                let _ = tx.send(raw).await;
            }
        }

        /// Closes the live update feed.
        pub fn close_updates(&self) {
            self.updates_tx.lock().unwrap().take();
        }

        /// The purchase gate. Hold the lock to keep purchases in flight.
        #[must_use]
        pub fn gate(&self) -> Arc<tokio::sync::Mutex<()>> {
            self.gate.clone()
        }
    }

    impl Default for MockStoreClient {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl StoreClient for MockStoreClient {
        async fn fetch_products(
            &self,
            ids: &[ProductId],
        ) -> StoreResult<Vec<ProductDescriptor>> {
            let products = self.products.lock().unwrap();
            Ok(products
                .iter()
                .filter(|d| ids.contains(&d.id))
                .cloned()
                .collect())
        }

        async fn purchase(&self, product: &ProductId) -> StoreResult<PurchaseReply> {
            let _held = self.gate.lock().await;
            self.purchase_replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(StoreError::PurchaseFailed {
                        product: product.clone(),
                        cause: "no scripted reply".to_string(),
                    })
                })
        }

        async fn transaction_history(&self) -> StoreResult<Vec<RawTransaction>> {
            self.history.lock().unwrap().clone()
        }

        async fn updates(&self) -> StoreResult<mpsc::Receiver<RawTransaction>> {
            self.updates_rx
                .lock()
                .unwrap()
                .take()
                .ok_or(StoreError::UnknownError)
        }

        async fn cancel_subscription(&self, _product: &ProductId) -> StoreResult<()> {
            self.cancel_reply.lock().unwrap().clone()
        }
    }
}
