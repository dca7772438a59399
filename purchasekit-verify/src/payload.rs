//! The signed transaction payload body.
//!
//! The JSON shape is defined by the storefront's signing service. All
//! timestamps are milliseconds since the Unix epoch. A payload only
//! becomes a `TransactionRecord` after the signature, bundle, and
//! freshness checks pass.

use crate::error::{VerifyError, VerifyResult};
use chrono::{DateTime, Utc};
use purchasekit_types::{
    OwnershipType, RenewalInfo, RenewalState, RevocationReason, TransactionRecord,
};
use serde::{Deserialize, Serialize};

/// Renewal metadata as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadRenewal {
    /// Renewal state.
    pub state: RenewalState,
    /// True when the current period is a free trial.
    #[serde(default)]
    pub free_trial: bool,
}

/// The decoded transaction payload body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPayload {
    /// Store-issued transaction id.
    pub tid: u64,
    /// Product identifier.
    pub product: String,
    /// Bundle identity of the app the payload was signed for.
    pub bundle: String,
    /// Purchase date, milliseconds since epoch.
    pub purchased_at: i64,
    /// Expiration date, milliseconds since epoch.
    #[serde(default)]
    pub expires_at: Option<i64>,
    /// Revocation date, milliseconds since epoch.
    #[serde(default)]
    pub revoked_at: Option<i64>,
    /// Why the transaction was revoked, when known.
    #[serde(default)]
    pub revocation_reason: Option<RevocationReason>,
    /// Ownership type; absent means a direct purchase.
    #[serde(default)]
    pub ownership: Option<OwnershipType>,
    /// Renewal metadata for auto-renewing subscriptions.
    #[serde(default)]
    pub renewal: Option<PayloadRenewal>,
    /// When the storefront signed this payload, milliseconds since epoch.
    pub signed_at: i64,
}

impl TransactionPayload {
    /// Converts the payload into an immutable verified record.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if any timestamp is outside the
    /// representable range.
    pub fn into_record(self) -> VerifyResult<TransactionRecord> {
        let purchase_date = millis_to_datetime(self.purchased_at, "purchased_at")?;
        let expiration_date = self
            .expires_at
            .map(|ms| millis_to_datetime(ms, "expires_at"))
            .transpose()?;
        let revocation_date = self
            .revoked_at
            .map(|ms| millis_to_datetime(ms, "revoked_at"))
            .transpose()?;

        Ok(TransactionRecord {
            transaction_id: self.tid.into(),
            product_id: self.product.into(),
            purchase_date,
            expiration_date,
            revocation_date,
            revocation_reason: self.revocation_reason,
            ownership: self.ownership.unwrap_or(OwnershipType::Purchased),
            renewal: self.renewal.map(|r| RenewalInfo {
                state: r.state,
                is_free_trial: r.free_trial,
            }),
        })
    }
}

fn millis_to_datetime(ms: i64, field: &str) -> VerifyResult<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| VerifyError::InvalidPayload(format!("{field} out of range: {ms}")))
}
