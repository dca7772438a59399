//! Process-wide store configuration.
//!
//! Supplied exactly once before first use. Every other operation fails
//! with `ConfigurationMissing`/`ServiceNotStarted` until it is set, and
//! re-configuration after start is rejected.

use crate::ProductId;
use serde::{Deserialize, Serialize};

/// Configuration for the store core.
///
/// Recognized options exactly as enumerated here; deserialization rejects
/// anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Product ids to load from the storefront catalog.
    pub product_ids: Vec<String>,

    /// Ids of lifetime products. Lifetime products are mandatory: a
    /// catalog load fails if the store reports no match for one of these.
    pub lifetime_ids: Vec<String>,

    /// Expiration window for non-renewing subscriptions, in days.
    /// Absent means they never expire.
    #[serde(default)]
    pub non_renewable_expiration_days: Option<u32>,

    /// Sort loaded products ascending by price.
    #[serde(default)]
    pub auto_sort_products: bool,
}

impl StoreConfig {
    /// Creates a configuration with the given product ids and defaults
    /// for everything else.
    #[must_use]
    pub fn new(product_ids: Vec<String>, lifetime_ids: Vec<String>) -> Self {
        Self {
            product_ids,
            lifetime_ids,
            non_renewable_expiration_days: None,
            auto_sort_products: false,
        }
    }

    /// Sets the non-renewing expiration window.
    #[must_use]
    pub fn with_non_renewable_expiration_days(mut self, days: u32) -> Self {
        self.non_renewable_expiration_days = Some(days);
        self
    }

    /// Enables price sorting of loaded products.
    #[must_use]
    pub fn with_auto_sort(mut self) -> Self {
        self.auto_sort_products = true;
        self
    }

    /// All product ids to request from the storefront: the configured
    /// product ids plus any lifetime ids not already listed.
    #[must_use]
    pub fn all_product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = self.product_ids.iter().map(ProductId::from).collect();
        for lifetime in &self.lifetime_ids {
            if !self.product_ids.contains(lifetime) {
                ids.push(ProductId::from(lifetime.clone()));
            }
        }
        ids
    }

    /// Returns true if the given product is configured as a lifetime
    /// product.
    #[must_use]
    pub fn is_lifetime(&self, id: &ProductId) -> bool {
        self.lifetime_ids.iter().any(|l| l == id.as_str())
    }
}
