//! Product identity and classification.
//!
//! A `ProductDescriptor` is immutable once loaded from the storefront.
//! The catalog replaces descriptors wholesale on each successful load;
//! there is no partial merge.

use crate::ProductId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Classification of a purchasable product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Consumed on use; never contributes a standing entitlement.
    Consumable,
    /// Purchased once, owned indefinitely.
    NonConsumable,
    /// Subscription renewed automatically by the storefront.
    AutoRenewingSubscription,
    /// Subscription with no automatic renewal; expiration is computed
    /// locally from the configured window.
    NonRenewingSubscription,
    /// One-time purchase unlocking the product forever.
    Lifetime,
}

impl ProductKind {
    /// Returns true if a purchase of this kind grants a standing
    /// entitlement (everything except consumables).
    #[must_use]
    pub fn grants_entitlement(&self) -> bool {
        !matches!(self, Self::Consumable)
    }

    /// Returns true for subscription-like kinds whose entitlement can
    /// lapse over time.
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        matches!(
            self,
            Self::AutoRenewingSubscription | Self::NonRenewingSubscription
        )
    }
}

/// A product as loaded from the storefront catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    /// Opaque unique product identifier.
    pub id: ProductId,
    /// Price in minor currency units; currency-agnostic ordering key.
    pub price_minor_units: i64,
    /// Product classification.
    pub kind: ProductKind,
}

impl ProductDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(id: impl Into<ProductId>, price_minor_units: i64, kind: ProductKind) -> Self {
        Self {
            id: id.into(),
            price_minor_units,
            kind,
        }
    }

    /// Total order used for deterministic catalog presentation:
    /// ascending price, ties broken by lexical id.
    #[must_use]
    pub fn display_cmp(&self, other: &Self) -> Ordering {
        match self.price_minor_units.cmp(&other.price_minor_units) {
            Ordering::Equal => self.id.cmp(&other.id),
            other => other,
        }
    }
}
