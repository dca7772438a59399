//! The shared error taxonomy for store operations.
//!
//! Every component speaks this vocabulary: precondition violations are
//! returned synchronously to the caller, verification failures on the
//! live stream are recovered locally, and terminal purchase/restore
//! failures reach both the observer and the direct caller.
//!
//! Equality compares the error kind and identifying fields only — never
//! cause text. Two `PurchaseFailed` errors for the same product are equal
//! even when the underlying store messages differ.

use crate::ProductId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the store core.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A configured product has no match in the storefront catalog.
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// A purchase attempt terminated in failure.
    #[error("purchase failed for {product}: {cause}")]
    PurchaseFailed {
        /// The product being purchased.
        product: ProductId,
        /// Store-reported cause. Excluded from equality.
        cause: String,
    },

    /// A transaction payload failed signature, identity, or freshness
    /// verification.
    #[error("transaction verification failed")]
    VerificationFailed,

    /// No configuration has been supplied yet.
    #[error("store configuration missing")]
    ConfigurationMissing,

    /// The service has not been started.
    #[error("store service not started")]
    ServiceNotStarted,

    /// Another purchase is already in flight. Purchases are serialized
    /// globally: the underlying store exposes one purchase sheet at a
    /// time.
    #[error("another purchase is already in progress")]
    PurchaseInProgress,

    /// Subscription cancellation could not be initiated.
    #[error("cancel subscription failed: {0}")]
    CancelSubscriptionFailed(String),

    /// A restore operation failed before reconciliation; no partial
    /// state was applied.
    #[error("restore purchases failed: {0}")]
    RestorePurchasesFailed(String),

    /// Anything the taxonomy cannot name.
    #[error("unknown store error")]
    UnknownError,
}

impl StoreError {
    /// Returns the fieldless kind of this error, for matching without
    /// destructuring.
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::ProductNotFound(_) => StoreErrorKind::ProductNotFound,
            Self::PurchaseFailed { .. } => StoreErrorKind::PurchaseFailed,
            Self::VerificationFailed => StoreErrorKind::VerificationFailed,
            Self::ConfigurationMissing => StoreErrorKind::ConfigurationMissing,
            Self::ServiceNotStarted => StoreErrorKind::ServiceNotStarted,
            Self::PurchaseInProgress => StoreErrorKind::PurchaseInProgress,
            Self::CancelSubscriptionFailed(_) => StoreErrorKind::CancelSubscriptionFailed,
            Self::RestorePurchasesFailed(_) => StoreErrorKind::RestorePurchasesFailed,
            Self::UnknownError => StoreErrorKind::UnknownError,
        }
    }
}

// Equality over kind and identifying fields; cause strings are carried
// for display only.
impl PartialEq for StoreError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::ProductNotFound(a), Self::ProductNotFound(b)) => a == b,
            (
                Self::PurchaseFailed { product: a, .. },
                Self::PurchaseFailed { product: b, .. },
            ) => a == b,
            _ => self.kind() == other.kind(),
        }
    }
}

impl Eq for StoreError {}

/// Fieldless discriminant of `StoreError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// See `StoreError::ProductNotFound`.
    ProductNotFound,
    /// See `StoreError::PurchaseFailed`.
    PurchaseFailed,
    /// See `StoreError::VerificationFailed`.
    VerificationFailed,
    /// See `StoreError::ConfigurationMissing`.
    ConfigurationMissing,
    /// See `StoreError::ServiceNotStarted`.
    ServiceNotStarted,
    /// See `StoreError::PurchaseInProgress`.
    PurchaseInProgress,
    /// See `StoreError::CancelSubscriptionFailed`.
    CancelSubscriptionFailed,
    /// See `StoreError::RestorePurchasesFailed`.
    RestorePurchasesFailed,
    /// See `StoreError::UnknownError`.
    UnknownError,
}
