//! Transaction store.
//!
//! Holds only server-confirmed transactions. Every successful mutation is
//! followed by a full re-fetch, so after each user action the server is the
//! source of truth and there is no optimistic row to roll back.

use shared::{Transaction, TransactionFields, TransactionKind, ValidationError};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::error::{RemoteFailure, SyncResult};
use crate::services::{Notifier, RemoteStore};

/// Validate user input and apply the chosen direction to the amount.
/// The description is sent exactly as typed.
pub fn validate_transaction(
    description: &str,
    amount: f64,
    kind: TransactionKind,
) -> Result<TransactionFields, ValidationError> {
    if description.trim().is_empty() {
        return Err(ValidationError::EmptyDescription);
    }
    if !amount.is_finite() {
        return Err(ValidationError::InvalidAmount(amount.to_string()));
    }
    Ok(TransactionFields {
        text: description.to_string(),
        amount: kind.signed(amount),
    })
}

/// Parse a typed amount, tolerating a currency symbol, spaces and thousands separators
pub fn parse_amount_input(input: &str) -> Result<f64, ValidationError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' '))
        .collect();
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount),
        _ => Err(ValidationError::InvalidAmount(input.to_string())),
    }
}

pub struct TransactionStore<R: RemoteStore> {
    remote: Arc<R>,
    transactions: RwLock<Vec<Transaction>>,
    notifier: Notifier,
}

impl<R: RemoteStore> TransactionStore<R> {
    pub fn new(remote: Arc<R>, notifier: Notifier) -> Self {
        Self {
            remote,
            transactions: RwLock::new(Vec::new()),
            notifier,
        }
    }

    /// Replace the collection with the latest server listing.
    ///
    /// On failure the previous collection is kept and the failure is reported.
    pub async fn refresh(&self) -> Result<(), RemoteFailure> {
        match self.remote.list_transactions().await {
            Ok(latest) => {
                info!("Loaded {} transactions", latest.len());
                *self.transactions.write().unwrap_or_else(PoisonError::into_inner) = latest;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(format!("Failed to load transactions: {}", e));
                Err(e)
            }
        }
    }

    pub async fn create(&self, description: &str, amount: f64, kind: TransactionKind) -> SyncResult<()> {
        let fields = validate_transaction(description, amount, kind)?;
        match self.remote.create_transaction(&fields).await {
            Ok(created) => {
                info!("💰 Created transaction {} ({:.2})", created.id, created.amount);
                self.notifier.success("Transaction added");
                self.refresh_after_write().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(format!("Failed to add transaction: {}", e));
                Err(e.into())
            }
        }
    }

    /// Full replace of description and amount
    pub async fn update(&self, id: &str, description: &str, amount: f64, kind: TransactionKind) -> SyncResult<()> {
        let fields = validate_transaction(description, amount, kind)?;
        match self.remote.update_transaction(id, &fields).await {
            Ok(()) => {
                info!("Updated transaction {}", id);
                self.notifier.success("Transaction updated");
                self.refresh_after_write().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(format!("Failed to update transaction: {}", e));
                Err(e.into())
            }
        }
    }

    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        match self.remote.delete_transaction(id).await {
            Ok(()) => {
                info!("🗑️ Deleted transaction {}", id);
                self.notifier.success("Transaction deleted");
                self.refresh_after_write().await;
                Ok(())
            }
            Err(e) => {
                self.notifier.error(format!("Failed to delete transaction: {}", e));
                Err(e.into())
            }
        }
    }

    /// Current snapshot, in server order
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get(&self, id: &str) -> Option<Transaction> {
        self.transactions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.transactions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // The write already succeeded; a failed re-fetch is reported by refresh()
    // and leaves the previous listing in place.
    async fn refresh_after_write(&self) {
        if self.refresh().await.is_err() {
            warn!("Transaction list may be stale until the next refresh");
        }
    }
}
