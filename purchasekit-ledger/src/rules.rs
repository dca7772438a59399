//! Entitlement derivation rules.
//!
//! Classification comes from the loaded catalog when available. Records
//! for products the catalog has not (yet) described fall back to shape:
//! a configured lifetime id is Lifetime, a record carrying an expiration
//! date is an auto-renewing subscription, anything else is treated as
//! non-consumable. Restore therefore works before the first catalog load.

use chrono::{DateTime, Duration, Utc};
use purchasekit_types::{ProductId, ProductKind, StoreConfig, TransactionRecord};
use std::collections::{HashMap, HashSet};

/// Rules the ledger derives `is_active` with.
#[derive(Debug, Clone, Default)]
pub struct EntitlementRules {
    /// Product classification from the loaded catalog.
    kinds: HashMap<ProductId, ProductKind>,
    /// Products configured as lifetime (mandatory, always Lifetime).
    lifetime: HashSet<ProductId>,
    /// Expiration window for non-renewing subscriptions, in days.
    /// Absent means they never expire.
    non_renewable_expiration_days: Option<u32>,
}

impl EntitlementRules {
    /// Builds rules from the store configuration.
    #[must_use]
    pub fn from_config(config: &StoreConfig) -> Self {
        Self {
            kinds: HashMap::new(),
            lifetime: config.lifetime_ids.iter().map(ProductId::from).collect(),
            non_renewable_expiration_days: config.non_renewable_expiration_days,
        }
    }

    /// Replaces catalog-derived classifications after a catalog load.
    pub fn set_kinds(&mut self, kinds: impl IntoIterator<Item = (ProductId, ProductKind)>) {
        self.kinds = kinds.into_iter().collect();
    }

    /// Classifies the product a record applies to.
    #[must_use]
    pub fn kind_for(&self, record: &TransactionRecord) -> ProductKind {
        if let Some(kind) = self.kinds.get(&record.product_id) {
            return *kind;
        }
        if self.lifetime.contains(&record.product_id) {
            return ProductKind::Lifetime;
        }
        if record.expiration_date.is_some() {
            return ProductKind::AutoRenewingSubscription;
        }
        ProductKind::NonConsumable
    }

    /// Derives whether a record grants an active entitlement at `now`.
    ///
    /// A revoked record never contributes an active entitlement,
    /// regardless of expiration.
    #[must_use]
    pub fn is_active(&self, record: &TransactionRecord, now: DateTime<Utc>) -> bool {
        if record.is_revoked() {
            return false;
        }
        match self.kind_for(record) {
            ProductKind::Lifetime | ProductKind::NonConsumable => true,
            ProductKind::AutoRenewingSubscription => match record.expiration_date {
                None => true,
                Some(expiration) => expiration > now,
            },
            ProductKind::NonRenewingSubscription => {
                match self.non_renewable_expiration_days {
                    None => true,
                    Some(days) => record.purchase_date + Duration::days(i64::from(days)) > now,
                }
            }
            ProductKind::Consumable => false,
        }
    }
}
