//! Client-side synchronization engine for the budget planner.
//!
//! Two collections live behind a REST API: transactions and the monthly
//! plan. Transactions are only ever shown as the server returns them and are
//! re-fetched after every change. Plan rows are edited locally and written
//! back through a per-row debounced coalescer, with temporary ids reconciled
//! to server ids once a row is first created.
//!
//! ## Layout
//!
//! - **services**: the REST adapter, notifications, logging setup, date helpers
//! - **sync**: write coalescing and id reconciliation
//! - **stores**: the transaction store and the plan store
//! - **domain**: derived metrics and table formatting
//! - **engine**: [`SyncEngine`], the facade used by the presentation layer

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod services;
pub mod stores;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::SyncConfig;
pub use engine::SyncEngine;
pub use error::{RemoteFailure, SyncError, SyncResult};
pub use services::{ApiClient, Notification, NotificationLevel, RemoteStore};
pub use shared::{Transaction, TransactionKind, ValidationError};
