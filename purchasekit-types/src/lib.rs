//! Core type definitions for PurchaseKit.
//!
//! This crate defines the fundamental types shared by every part of the
//! purchase core:
//! - Product, transaction, and attempt identifiers
//! - Product descriptors and classification
//! - Verified transaction records
//! - The process-wide store configuration
//! - The shared error taxonomy
//!
//! Nothing here talks to the storefront. Types are constructed by the
//! verifier and engine crates and consumed everywhere.

mod config;
mod error;
mod ids;
mod product;
mod transaction;

pub use config::StoreConfig;
pub use error::{StoreError, StoreErrorKind, StoreResult};
pub use ids::{AttemptId, ProductId, TransactionId};
pub use product::{ProductDescriptor, ProductKind};
pub use transaction::{
    OwnershipType, RenewalInfo, RenewalState, RevocationReason, TransactionRecord,
};
