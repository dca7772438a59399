//! The loaded product catalog.
//!
//! A catalog is built from the storefront's descriptor response and
//! replaced wholesale on each successful load. Lifetime products are
//! mandatory: a load that cannot resolve one fails before anything is
//! swapped in.

use purchasekit_types::{
    ProductDescriptor, ProductId, ProductKind, StoreConfig, StoreError, StoreResult,
};
use std::collections::HashMap;

/// An immutable snapshot of the loaded products.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<ProductDescriptor>,
    by_id: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Builds a catalog from storefront descriptors.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` if a configured lifetime id has no
    /// matching descriptor.
    pub fn build(
        mut descriptors: Vec<ProductDescriptor>,
        config: &StoreConfig,
    ) -> StoreResult<Self> {
        for lifetime in &config.lifetime_ids {
            if !descriptors.iter().any(|d| d.id.as_str() == lifetime) {
                return Err(StoreError::ProductNotFound(ProductId::from(
                    lifetime.clone(),
                )));
            }
        }

        if config.auto_sort_products {
            descriptors.sort_by(|a, b| a.display_cmp(b));
        }

        let by_id = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.id.clone(), i))
            .collect();

        Ok(Self {
            products: descriptors,
            by_id,
        })
    }

    /// The products in presentation order.
    #[must_use]
    pub fn products(&self) -> &[ProductDescriptor] {
        &self.products
    }

    /// Looks up a product by id.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&ProductDescriptor> {
        self.by_id.get(id).map(|&i| &self.products[i])
    }

    /// Returns true if the catalog carries the given product.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Product classifications for the entitlement rules.
    pub fn kinds(&self) -> impl Iterator<Item = (ProductId, ProductKind)> + '_ {
        self.products.iter().map(|d| (d.id.clone(), d.kind))
    }

    /// Number of loaded products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Returns true if no products are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}
