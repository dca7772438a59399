//! Purchase engine for PurchaseKit.
//!
//! Ties the verifier and the entitlement ledger together behind a single
//! facade, `StoreService`, consumed by the thin bridge layer.
//!
//! # Architecture
//!
//! - **Catalog**: validated, optionally price-sorted product snapshot,
//!   replaced atomically on each load
//! - **Purchase state machine**: one globally-serialized attempt,
//!   `Idle → Purchasing → {Success, Pending, Cancelled, Failed}`
//! - **Update stream processor**: long-lived task draining the
//!   storefront's transaction feed through verify → reconcile → notify
//! - **Dispatcher**: one observer, strictly ordered notifications
//!
//! Every ledger and state-machine mutation goes through one critical
//! section; storefront I/O happens outside it.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use purchasekit_engine::client::mock::MockStoreClient;
//! use purchasekit_engine::StoreService;
//! use purchasekit_verify::TransactionVerifier;
//!
//! let client = Arc::new(MockStoreClient::new());
//! let verifier = TransactionVerifier::new("com.example.app").unwrap();
//! let service = StoreService::new(client, verifier);
//! ```

pub mod catalog;
pub mod client;
mod dispatcher;
mod observer;
mod purchase;
mod service;
mod stream;

pub use catalog::Catalog;
pub use client::{PurchaseReply, RawTransaction, StoreClient};
pub use observer::StoreObserver;
pub use purchase::{PurchaseAttempt, PurchaseTicket, StoreState};
pub use service::StoreService;
