//! Purchase attempt state machine.
//!
//! The machine is per-attempt, not persistent: `Idle` is both the
//! initial state and the state reached after any terminal outcome.
//! Purchases are serialized globally — the underlying store exposes one
//! purchase sheet at a time — so at most one attempt exists in the
//! process.

use chrono::{DateTime, Utc};
use purchasekit_types::{AttemptId, ProductId, StoreError, StoreResult};
use tokio::sync::oneshot;

/// The caller-visible purchase state.
///
/// Equality is per-variant over the fields shown; `Failed` compares the
/// error by kind, never by message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreState {
    /// No purchase in flight.
    Idle,
    /// The purchase sheet is up for this product.
    Purchasing(ProductId),
    /// Purchase confirmed, verified, and reconciled.
    Success(ProductId),
    /// Deferred pending approval; no ledger change yet.
    Pending(ProductId),
    /// The user dismissed the purchase UI. Not an error.
    Cancelled(ProductId),
    /// The purchase terminated in failure.
    Failed(ProductId, StoreError),
}

impl StoreState {
    /// The product this state refers to, if any.
    #[must_use]
    pub fn product(&self) -> Option<&ProductId> {
        match self {
            Self::Idle => None,
            Self::Purchasing(p)
            | Self::Success(p)
            | Self::Pending(p)
            | Self::Cancelled(p)
            | Self::Failed(p, _) => Some(p),
        }
    }

    /// Returns true for states that end an attempt.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success(_) | Self::Pending(_) | Self::Cancelled(_) | Self::Failed(..)
        )
    }
}

/// One in-flight purchase attempt. Created when a purchase is requested,
/// destroyed on its terminal state.
#[derive(Debug, Clone)]
pub struct PurchaseAttempt {
    /// Unique id of this attempt.
    pub attempt_id: AttemptId,
    /// The product being purchased.
    pub product_id: ProductId,
    /// When the attempt entered `Purchasing`.
    pub started_at: DateTime<Utc>,
}

impl PurchaseAttempt {
    /// Starts an attempt for a product.
    #[must_use]
    pub fn new(product_id: ProductId) -> Self {
        Self {
            attempt_id: AttemptId::new(),
            product_id,
            started_at: Utc::now(),
        }
    }
}

/// Handle returned to the caller that initiated a purchase.
///
/// The call returns as soon as the attempt is in `Purchasing`; the
/// terminal state arrives here and through the observer, each exactly
/// once.
#[derive(Debug)]
pub struct PurchaseTicket {
    pub(crate) attempt_id: AttemptId,
    pub(crate) product_id: ProductId,
    pub(crate) outcome: oneshot::Receiver<StoreState>,
}

impl PurchaseTicket {
    /// The attempt this ticket tracks.
    #[must_use]
    pub fn attempt_id(&self) -> AttemptId {
        self.attempt_id
    }

    /// The product being purchased.
    #[must_use]
    pub fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    /// Waits for the terminal state of the attempt.
    ///
    /// # Errors
    ///
    /// Returns `UnknownError` if the service shut down before the
    /// attempt terminated.
    pub async fn outcome(self) -> StoreResult<StoreState> {
        self.outcome.await.map_err(|_| StoreError::UnknownError)
    }
}
