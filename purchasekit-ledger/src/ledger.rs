//! The entitlement ledger.
//!
//! The ledger is the authoritative product→entitlement mapping, updated
//! exclusively from verified transaction records. Reconciliation is an
//! idempotent, commutative upsert: replaying the same record is a no-op,
//! and any arrival order converges on the same final state — the record
//! with the greatest purchase date wins, ties broken by transaction id.

use crate::change::EntitlementChange;
use crate::entry::EntitlementEntry;
use crate::rules::EntitlementRules;
use chrono::{DateTime, Utc};
use purchasekit_types::{
    OwnershipType, ProductId, ProductKind, RenewalInfo, RenewalState, RevocationReason,
    TransactionId, TransactionRecord,
};
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Per-product purchase history kept by the ledger.
#[derive(Debug, Clone)]
struct Slot {
    /// Oldest record seen for the product (source back-reference).
    oldest: TransactionRecord,
    /// Record with the greatest (purchase date, transaction id).
    latest: TransactionRecord,
}

/// What applying one record changed, for change classification.
struct Applied {
    duplicate: bool,
    consumable: bool,
    superseded: bool,
    prev_active: bool,
    prev_revoked: bool,
    prev_renewal: Option<RenewalInfo>,
}

/// Result of replaying a full transaction history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// Granular per-product changes, identical in shape to live updates.
    pub changes: Vec<EntitlementChange>,
    /// Products that became active.
    pub added: Vec<ProductId>,
    /// Products that stopped being active.
    pub removed: Vec<ProductId>,
}

/// The authoritative mapping from products to entitlements.
#[derive(Debug, Clone, Default)]
pub struct EntitlementLedger {
    rules: EntitlementRules,
    slots: HashMap<ProductId, Slot>,
    /// Every transaction ever reconciled, keyed by id. Consumables are
    /// recorded here and nowhere else.
    audit: BTreeMap<TransactionId, TransactionRecord>,
}

impl EntitlementLedger {
    /// Creates a ledger with the given derivation rules.
    #[must_use]
    pub fn new(rules: EntitlementRules) -> Self {
        Self {
            rules,
            slots: HashMap::new(),
            audit: BTreeMap::new(),
        }
    }

    /// Replaces catalog-derived product classifications.
    pub fn set_kinds(&mut self, kinds: impl IntoIterator<Item = (ProductId, ProductKind)>) {
        self.rules.set_kinds(kinds);
    }

    /// Reconciles one verified record into the ledger and classifies the
    /// observable changes.
    ///
    /// Safe to call multiple times with the same transaction id
    /// (idempotent) and in any order (the latest purchase date wins, not
    /// call order).
    pub fn reconcile(&mut self, record: TransactionRecord) -> Vec<EntitlementChange> {
        let now = Utc::now();
        let product = record.product_id.clone();
        let renewal = record.renewal;
        let revoked = record.is_revoked();
        let reason = record.revocation_reason;

        let applied = self.apply(record, now);
        let mut changes = Vec::new();

        if applied.duplicate {
            debug!(%product, "duplicate transaction, ledger unchanged");
            return changes;
        }
        if applied.consumable {
            debug!(%product, "consumable recorded for audit only");
            return changes;
        }
        if !applied.superseded {
            debug!(%product, "stale record, entitlement unchanged");
            return changes;
        }

        let now_active = self.is_active(&product, now);
        if !applied.prev_active && now_active {
            changes.push(EntitlementChange::PurchaseSucceeded {
                product: product.clone(),
            });
        }

        if revoked && !applied.prev_revoked {
            changes.push(match reason {
                Some(RevocationReason::Refund) => EntitlementChange::PurchaseRefunded {
                    product: product.clone(),
                },
                _ => EntitlementChange::PurchaseRevoked {
                    product: product.clone(),
                },
            });
        }

        if let Some(renewal) = renewal {
            let prev_state = applied.prev_renewal.map(|r| r.state);
            changes.extend(classify_renewal(&product, prev_state, renewal));
        }

        debug!(%product, count = changes.len(), "reconciled transaction");
        changes
    }

    /// Rebuilds every entry from scratch by replaying the given history,
    /// then diffs against the previous snapshot so observers see the same
    /// granular transitions a live update would produce.
    pub fn restore_from_history(
        &mut self,
        records: Vec<TransactionRecord>,
    ) -> RestoreOutcome {
        let now = Utc::now();
        let prev_slots = std::mem::take(&mut self.slots);
        self.audit.clear();

        for record in records {
            self.apply(record, now);
        }

        let mut products: BTreeSet<ProductId> = prev_slots.keys().cloned().collect();
        products.extend(self.slots.keys().cloned());

        let mut outcome = RestoreOutcome::default();
        for product in products {
            let prev = prev_slots.get(&product).map(|s| &s.latest);
            let was_active = prev.is_some_and(|r| self.rules.is_active(r, now));
            let was_revoked = prev.is_some_and(TransactionRecord::is_revoked);
            let prev_state = prev.and_then(|r| r.renewal).map(|r| r.state);

            let latest = self.slots.get(&product).map(|s| &s.latest);
            let now_active = latest.is_some_and(|r| self.rules.is_active(r, now));
            let now_revoked = latest.is_some_and(|r| r.is_revoked());

            if !was_active && now_active {
                outcome.added.push(product.clone());
                outcome.changes.push(EntitlementChange::PurchaseSucceeded {
                    product: product.clone(),
                });
            }
            if was_active && !now_active {
                outcome.removed.push(product.clone());
            }

            if now_revoked && !was_revoked {
                let reason = latest.and_then(|r| r.revocation_reason);
                outcome.changes.push(match reason {
                    Some(RevocationReason::Refund) => EntitlementChange::PurchaseRefunded {
                        product: product.clone(),
                    },
                    _ => EntitlementChange::PurchaseRevoked {
                        product: product.clone(),
                    },
                });
            }

            if let Some(renewal) = latest.and_then(|r| r.renewal) {
                if prev_state != Some(renewal.state) {
                    outcome
                        .changes
                        .extend(classify_renewal(&product, prev_state, renewal));
                }
            }
        }

        debug!(
            added = outcome.added.len(),
            removed = outcome.removed.len(),
            changes = outcome.changes.len(),
            "restored from history"
        );
        outcome
    }

    /// Returns the entitlement entry for a product, if it has purchase
    /// history.
    #[must_use]
    pub fn entitlement(&self, product: &ProductId) -> Option<EntitlementEntry> {
        let now = Utc::now();
        self.slots.get(product).map(|slot| EntitlementEntry {
            product_id: product.clone(),
            is_active: self.rules.is_active(&slot.latest, now),
            source_transaction_id: slot.oldest.transaction_id,
            latest_transaction_id: slot.latest.transaction_id,
            family_shared: slot.latest.ownership == OwnershipType::FamilyShared,
        })
    }

    /// Returns every product the user is currently entitled to.
    #[must_use]
    pub fn all_active_entitlements(&self) -> BTreeSet<ProductId> {
        let now = Utc::now();
        self.slots
            .iter()
            .filter(|(_, slot)| self.rules.is_active(&slot.latest, now))
            .map(|(product, _)| product.clone())
            .collect()
    }

    /// Returns all entries, ordered by product id.
    #[must_use]
    pub fn entries(&self) -> Vec<EntitlementEntry> {
        let mut products: Vec<&ProductId> = self.slots.keys().collect();
        products.sort();
        products
            .into_iter()
            .filter_map(|p| self.entitlement(p))
            .collect()
    }

    /// Looks up a reconciled transaction by id.
    #[must_use]
    pub fn transaction(&self, id: &TransactionId) -> Option<&TransactionRecord> {
        self.audit.get(id)
    }

    /// Number of transactions ever reconciled.
    #[must_use]
    pub fn audit_len(&self) -> usize {
        self.audit.len()
    }

    fn is_active(&self, product: &ProductId, now: DateTime<Utc>) -> bool {
        self.slots
            .get(product)
            .is_some_and(|slot| self.rules.is_active(&slot.latest, now))
    }

    /// Upserts one record. The latest (purchase date, transaction id)
    /// wins; older records only extend the audit trail and the source
    /// back-reference.
    fn apply(&mut self, record: TransactionRecord, now: DateTime<Utc>) -> Applied {
        if self.audit.contains_key(&record.transaction_id) {
            return Applied {
                duplicate: true,
                consumable: false,
                superseded: false,
                prev_active: false,
                prev_revoked: false,
                prev_renewal: None,
            };
        }
        self.audit.insert(record.transaction_id, record.clone());

        if self.rules.kind_for(&record) == ProductKind::Consumable {
            return Applied {
                duplicate: false,
                consumable: true,
                superseded: false,
                prev_active: false,
                prev_revoked: false,
                prev_renewal: None,
            };
        }

        let prev = self.slots.get(&record.product_id);
        let prev_active = prev.is_some_and(|s| self.rules.is_active(&s.latest, now));
        let prev_revoked = prev.is_some_and(|s| s.latest.is_revoked());
        let prev_renewal = prev.and_then(|s| s.latest.renewal);

        let superseded = match self.slots.entry(record.product_id.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot {
                    oldest: record.clone(),
                    latest: record,
                });
                true
            }
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                if record.recency_cmp(&slot.oldest) == Ordering::Less {
                    slot.oldest = record.clone();
                }
                if record.supersedes(&slot.latest) {
                    slot.latest = record;
                    true
                } else {
                    false
                }
            }
        };

        Applied {
            duplicate: false,
            consumable: false,
            superseded,
            prev_active,
            prev_revoked,
            prev_renewal,
        }
    }
}

/// Maps a renewal-state transition to its observable change, if any.
/// The very first `WillRenew` observation is the default assumption and
/// stays silent.
fn classify_renewal(
    product: &ProductId,
    prev_state: Option<RenewalState>,
    renewal: RenewalInfo,
) -> Option<EntitlementChange> {
    if prev_state == Some(renewal.state) {
        return None;
    }
    if prev_state.is_none() && renewal.state == RenewalState::WillRenew {
        return None;
    }
    Some(match renewal.state {
        RenewalState::WillNotRenew => EntitlementChange::SubscriptionCancelled {
            product: product.clone(),
            is_free_trial: renewal.is_free_trial,
        },
        state => EntitlementChange::SubscriptionStatusChanged {
            product: product.clone(),
            state,
        },
    })
}
