//! Shared test helpers for ledger tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use purchasekit_ledger::{EntitlementLedger, EntitlementRules};
use purchasekit_types::{ProductId, ProductKind, StoreConfig, TransactionRecord};

/// A record purchased `days_ago` days in the past.
pub fn record_days_ago(tid: u64, product: &str, days_ago: i64) -> TransactionRecord {
    TransactionRecord::new(tid, product, Utc::now() - Duration::days(days_ago))
}

/// A ledger that classifies `premium.lifetime` as a lifetime product and
/// applies a 30-day non-renewing window.
pub fn configured_ledger() -> EntitlementLedger {
    let config = StoreConfig::new(
        vec![
            "pro".into(),
            "sub.monthly".into(),
            "pass.season".into(),
            "coins.100".into(),
        ],
        vec!["premium.lifetime".into()],
    )
    .with_non_renewable_expiration_days(30);

    let mut ledger = EntitlementLedger::new(EntitlementRules::from_config(&config));
    ledger.set_kinds([
        (ProductId::from("pro"), ProductKind::NonConsumable),
        (
            ProductId::from("sub.monthly"),
            ProductKind::AutoRenewingSubscription,
        ),
        (
            ProductId::from("pass.season"),
            ProductKind::NonRenewingSubscription,
        ),
        (ProductId::from("coins.100"), ProductKind::Consumable),
        (ProductId::from("premium.lifetime"), ProductKind::Lifetime),
    ]);
    ledger
}
