//! Shared test helpers for engine tests.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use ed25519_dalek::{Signer, SigningKey};
use purchasekit_engine::client::mock::MockStoreClient;
use purchasekit_engine::{RawTransaction, StoreObserver, StoreService, StoreState};
use purchasekit_ledger::EntitlementChange;
use purchasekit_types::{
    ProductDescriptor, ProductId, ProductKind, StoreConfig, StoreError,
};
use purchasekit_verify::TransactionVerifier;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Bundle identity used throughout the tests.
pub const TEST_BUNDLE: &str = "com.example.melody";

/// Returns a deterministic Ed25519 key pair from a fixed seed.
pub fn test_keypair() -> (SigningKey, [u8; 32]) {
    let seed: [u8; 32] = [
        3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5, 8, 9, 7, 9, 3, 2, 3, 8, 4, 6, 2, 6, 4, 3, 3, 8, 3,
        2, 7, 9, 5,
    ];
    let signing_key = SigningKey::from_bytes(&seed);
    let verifying_key = signing_key.verifying_key();
    (signing_key, verifying_key.to_bytes())
}

/// Signs a payload JSON string the way the storefront does.
pub fn sign_payload(signing_key: &SigningKey, payload_json: &str) -> String {
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload_json.as_bytes());
    let signature = signing_key.sign(payload_b64.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());
    format!("{payload_b64}.{sig_b64}")
}

/// A minimal payload body for a direct purchase made just now.
pub fn base_payload(tid: u64, product: &str) -> Value {
    let now_ms = chrono::Utc::now().timestamp_millis();
    json!({
        "tid": tid,
        "product": product,
        "bundle": TEST_BUNDLE,
        "purchased_at": now_ms,
        "signed_at": now_ms,
    })
}

/// Signs a payload body into a raw transaction.
pub fn signed_raw(signing_key: &SigningKey, payload: &Value) -> RawTransaction {
    let product = payload["product"].as_str().unwrap_or("unknown").to_string();
    RawTransaction::new(product, sign_payload(signing_key, &payload.to_string()))
}

/// A verified-format purchase of `product` made just now.
pub fn purchase_raw(signing_key: &SigningKey, tid: u64, product: &str) -> RawTransaction {
    signed_raw(signing_key, &base_payload(tid, product))
}

/// The product set every test configures.
pub fn default_products() -> Vec<ProductDescriptor> {
    vec![
        ProductDescriptor::new("pro", 999, ProductKind::NonConsumable),
        ProductDescriptor::new("premium.lifetime", 1999, ProductKind::Lifetime),
        ProductDescriptor::new("sub.monthly", 499, ProductKind::AutoRenewingSubscription),
        ProductDescriptor::new("coins.100", 99, ProductKind::Consumable),
    ]
}

/// The matching configuration.
pub fn default_config() -> StoreConfig {
    StoreConfig::new(
        vec!["pro".into(), "sub.monthly".into(), "coins.100".into()],
        vec!["premium.lifetime".into()],
    )
}

/// A fully configured, started service with a loaded catalog and a
/// recording observer attached.
pub async fn started_service() -> (Arc<MockStoreClient>, StoreService, Arc<RecordingObserver>) {
    let client = Arc::new(MockStoreClient::new());
    client.set_products(default_products());

    let (_, pk) = test_keypair();
    let verifier = TransactionVerifier::with_key(TEST_BUNDLE, &pk).unwrap();
    let service = StoreService::new(client.clone(), verifier);

    service.configure(default_config()).await.unwrap();
    service.start().await.unwrap();
    service.load_catalog().await.unwrap();

    let observer = Arc::new(RecordingObserver::default());
    service.set_observer(observer.clone());
    (client, service, observer)
}

/// Polls until the condition holds, failing after ~1s.
pub async fn wait_for(what: &str, condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    State(StoreState),
    Products(Vec<ProductDescriptor>),
    Entitlements {
        added: Vec<ProductId>,
        removed: Vec<ProductId>,
    },
    Update(EntitlementChange),
    Error(StoreError),
}

/// Observer that records every notification in arrival order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<Observed>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<Observed> {
        self.events.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<StoreState> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<EntitlementChange> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Update(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<StoreError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Error(err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn entitlement_diffs(&self) -> Vec<(Vec<ProductId>, Vec<ProductId>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Observed::Entitlements { added, removed } => Some((added, removed)),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StoreObserver for RecordingObserver {
    async fn state_changed(&self, state: StoreState) {
        self.events.lock().unwrap().push(Observed::State(state));
    }

    async fn products_loaded(&self, products: Vec<ProductDescriptor>) {
        self.events.lock().unwrap().push(Observed::Products(products));
    }

    async fn entitlements_changed(&self, added: Vec<ProductId>, removed: Vec<ProductId>) {
        self.events
            .lock()
            .unwrap()
            .push(Observed::Entitlements { added, removed });
    }

    async fn update_event(&self, change: EntitlementChange) {
        self.events.lock().unwrap().push(Observed::Update(change));
    }

    async fn error(&self, error: StoreError) {
        self.events.lock().unwrap().push(Observed::Error(error));
    }
}
