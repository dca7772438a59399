mod common;

use common::{
    purchase_raw, started_service, test_keypair, wait_for, RecordingObserver,
};
use pretty_assertions::assert_eq;
use purchasekit_engine::client::mock::MockStoreClient;
use purchasekit_engine::{PurchaseReply, RawTransaction, StoreService, StoreState};
use purchasekit_ledger::EntitlementChange;
use purchasekit_types::{ProductId, StoreConfig, StoreError};
use purchasekit_verify::TransactionVerifier;
use std::sync::Arc;
use std::time::Duration;

// ── Happy path ───────────────────────────────────────────────────

#[tokio::test]
async fn confirmed_purchase_reaches_success() {
    let (client, service, observer) = started_service().await;
    let (sk, _) = test_keypair();
    client.queue_purchase_reply(Ok(PurchaseReply::Confirmed(purchase_raw(&sk, 1, "pro"))));

    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    assert_eq!(ticket.product_id(), &ProductId::from("pro"));

    let outcome = ticket.outcome().await.unwrap();
    assert_eq!(outcome, StoreState::Success(ProductId::from("pro")));

    let entry = service
        .entitlement(&ProductId::from("pro"))
        .await
        .unwrap()
        .unwrap();
    assert!(entry.is_active);
    assert!(!service.is_purchasing().await);

    wait_for("purchasing then success", || {
        observer.states()
            == vec![
                StoreState::Purchasing(ProductId::from("pro")),
                StoreState::Success(ProductId::from("pro")),
            ]
    })
    .await;
    wait_for("purchase succeeded update event", || {
        observer.updates().contains(&EntitlementChange::PurchaseSucceeded {
            product: ProductId::from("pro"),
        })
    })
    .await;
    wait_for("entitlements changed", || {
        observer
            .entitlement_diffs()
            .contains(&(vec![ProductId::from("pro")], vec![]))
    })
    .await;
}

// ── Synchronous precondition failures ────────────────────────────

#[tokio::test]
async fn unconfigured_product_fails_without_entering_purchasing() {
    let (_client, service, observer) = started_service().await;

    let err = service
        .purchase(ProductId::from("not.configured"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::ProductNotFound(ProductId::from("not.configured"))
    );

    // Give the dispatcher a beat; no state notification may appear.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(observer.states().is_empty());
    assert!(!service.is_purchasing().await);
}

#[tokio::test]
async fn purchase_before_configure_fails() {
    let client = Arc::new(MockStoreClient::new());
    let (_, pk) = test_keypair();
    let verifier = TransactionVerifier::with_key(common::TEST_BUNDLE, &pk).unwrap();
    let service = StoreService::new(client, verifier);

    let err = service.purchase(ProductId::from("pro")).await.unwrap_err();
    assert_eq!(err, StoreError::ConfigurationMissing);
}

#[tokio::test]
async fn purchase_before_start_fails() {
    let client = Arc::new(MockStoreClient::new());
    let (_, pk) = test_keypair();
    let verifier = TransactionVerifier::with_key(common::TEST_BUNDLE, &pk).unwrap();
    let service = StoreService::new(client, verifier);
    service
        .configure(StoreConfig::new(vec!["pro".into()], vec![]))
        .await
        .unwrap();

    let err = service.purchase(ProductId::from("pro")).await.unwrap_err();
    assert_eq!(err, StoreError::ServiceNotStarted);
}

// ── Global serialization ─────────────────────────────────────────

#[tokio::test]
async fn second_purchase_is_rejected_while_first_is_in_flight() {
    let (client, service, _observer) = started_service().await;

    // Hold the first purchase at the store.
    let gate = client.gate();
    let hold = gate.lock().await;
    client.queue_purchase_reply(Ok(PurchaseReply::Cancelled));

    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    assert!(service.is_purchasing().await);
    assert_eq!(
        service.current_state().await,
        StoreState::Purchasing(ProductId::from("pro"))
    );

    let err = service
        .purchase(ProductId::from("sub.monthly"))
        .await
        .unwrap_err();
    assert_eq!(err, StoreError::PurchaseInProgress);

    // Release the store; the first attempt terminates and frees the
    // machine.
    drop(hold);
    let outcome = ticket.outcome().await.unwrap();
    assert_eq!(outcome, StoreState::Cancelled(ProductId::from("pro")));
    assert!(!service.is_purchasing().await);

    client.queue_purchase_reply(Ok(PurchaseReply::Cancelled));
    let second = service.purchase(ProductId::from("sub.monthly")).await;
    assert!(second.is_ok());
    second.unwrap().outcome().await.unwrap();
}

// ── Terminal outcomes ────────────────────────────────────────────

#[tokio::test]
async fn cancelled_purchase_is_not_an_error() {
    let (client, service, observer) = started_service().await;
    client.queue_purchase_reply(Ok(PurchaseReply::Cancelled));

    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    let outcome = ticket.outcome().await.unwrap();
    assert_eq!(outcome, StoreState::Cancelled(ProductId::from("pro")));

    // No ledger change.
    assert!(service
        .entitlement(&ProductId::from("pro"))
        .await
        .unwrap()
        .is_none());
    wait_for("terminal cancelled notification", || {
        observer
            .states()
            .contains(&StoreState::Cancelled(ProductId::from("pro")))
    })
    .await;
}

#[tokio::test]
async fn pending_purchase_leaves_ledger_untouched() {
    let (client, service, _observer) = started_service().await;
    client.queue_purchase_reply(Ok(PurchaseReply::Pending));

    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    let outcome = ticket.outcome().await.unwrap();
    assert_eq!(outcome, StoreState::Pending(ProductId::from("pro")));

    assert!(service
        .active_entitlements()
        .await
        .unwrap()
        .is_empty());
    assert!(!service.is_purchasing().await);
}

#[tokio::test]
async fn store_failure_wraps_into_purchase_failed() {
    let (client, service, _observer) = started_service().await;
    client.queue_purchase_reply(Ok(PurchaseReply::Failed(
        "payment method declined".to_string(),
    )));

    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    match ticket.outcome().await.unwrap() {
        StoreState::Failed(product, error) => {
            assert_eq!(product, ProductId::from("pro"));
            // Kind-based equality: the cause text is not compared.
            assert_eq!(
                error,
                StoreError::PurchaseFailed {
                    product: ProductId::from("pro"),
                    cause: String::new(),
                }
            );
        }
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn confirmed_but_unverifiable_purchase_fails() {
    let (client, service, observer) = started_service().await;
    client.queue_purchase_reply(Ok(PurchaseReply::Confirmed(RawTransaction::new(
        "pro",
        "not.a.signed.payload",
    ))));

    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    let outcome = ticket.outcome().await.unwrap();
    assert_eq!(
        outcome,
        StoreState::Failed(ProductId::from("pro"), StoreError::VerificationFailed)
    );

    // Unverified data never reaches the ledger.
    assert!(service
        .entitlement(&ProductId::from("pro"))
        .await
        .unwrap()
        .is_none());
    wait_for("failed notification", || {
        observer
            .states()
            .iter()
            .any(|s| matches!(s, StoreState::Failed(_, StoreError::VerificationFailed)))
    })
    .await;
}

// ── Observer replacement ─────────────────────────────────────────

#[tokio::test]
async fn replacing_the_observer_drops_the_previous_one() {
    let (client, service, first) = started_service().await;
    let second = Arc::new(RecordingObserver::default());
    service.set_observer(second.clone());

    let (sk, _) = test_keypair();
    client.queue_purchase_reply(Ok(PurchaseReply::Confirmed(purchase_raw(&sk, 1, "pro"))));
    let ticket = service.purchase(ProductId::from("pro")).await.unwrap();
    ticket.outcome().await.unwrap();

    wait_for("second observer saw the purchase", || {
        second
            .states()
            .contains(&StoreState::Success(ProductId::from("pro")))
    })
    .await;
    assert!(first.states().is_empty());
}
