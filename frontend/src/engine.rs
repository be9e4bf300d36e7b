//! The synchronization engine: the one entry point the presentation layer
//! talks to.
//!
//! It owns both stores. Callers issue intents and read snapshots; they never
//! mutate store contents directly. Remote failures are caught inside each
//! operation and turned into notifications, drained with
//! [`SyncEngine::take_notifications`].

use chrono::{DateTime, Local};
use shared::{FormattedTransaction, Transaction, TransactionKind};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SyncConfig;
use crate::domain::{BudgetSummary, MetricsEngine, TransactionTable};
use crate::error::{RemoteFailure, SyncResult};
use crate::services::{ApiClient, Notification, Notifier, RemoteStore};
use crate::stores::{PlanEdit, PlanItem, PlanStore, SyncState, TransactionStore};
use crate::sync::PlanItemId;

pub struct SyncEngine<R: RemoteStore> {
    config: SyncConfig,
    transactions: TransactionStore<R>,
    plan: PlanStore<R>,
    metrics: MetricsEngine,
    table: TransactionTable,
    notifier: Notifier,
}

impl SyncEngine<ApiClient> {
    /// Engine backed by the HTTP API described by `config`
    pub fn connect(config: SyncConfig) -> Result<Self, RemoteFailure> {
        let client = ApiClient::new(&config)?;
        info!("🔌 Using budget API at {}", client.base_url());
        Ok(Self::new(Arc::new(client), config))
    }
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: Arc<R>, config: SyncConfig) -> Self {
        let notifier = Notifier::new();
        Self {
            transactions: TransactionStore::new(Arc::clone(&remote), notifier.clone()),
            plan: PlanStore::new(remote, config.debounce, notifier.clone()),
            metrics: MetricsEngine::new(),
            table: TransactionTable::new(),
            notifier,
            config,
        }
    }

    /// Initial load of both collections.
    ///
    /// A failed load is reported and leaves that store empty; the other
    /// store still loads. Default categories are seeded when the server
    /// has no plan yet.
    pub async fn start(&self) {
        let (transactions, plan) = tokio::join!(self.transactions.refresh(), self.plan.refresh());
        if transactions.is_err() {
            warn!("Starting without transactions");
        }
        match plan {
            Ok(()) => {
                self.plan.seed_defaults(&self.config.default_categories);
            }
            Err(_) => warn!("Starting without a monthly plan"),
        }
    }

    pub async fn add_transaction(&self, description: &str, amount: f64, kind: TransactionKind) -> SyncResult<()> {
        self.transactions.create(description, amount, kind).await
    }

    pub async fn update_transaction(
        &self,
        id: &str,
        description: &str,
        amount: f64,
        kind: TransactionKind,
    ) -> SyncResult<()> {
        self.transactions.update(id, description, amount, kind).await
    }

    pub async fn delete_transaction(&self, id: &str) -> SyncResult<()> {
        self.transactions.delete(id).await
    }

    pub async fn refresh_transactions(&self) -> Result<(), RemoteFailure> {
        self.transactions.refresh().await
    }

    pub fn add_plan_row(&self) -> PlanItemId {
        self.plan.add_row()
    }

    pub fn add_plan_row_with_category(&self, category: impl Into<String>) -> PlanItemId {
        self.plan.add_row_with_category(category)
    }

    pub fn edit_plan_field(&self, id: &PlanItemId, edit: PlanEdit) -> SyncResult<()> {
        Ok(self.plan.edit_field(id, edit)?)
    }

    pub async fn remove_plan_row(&self, id: &PlanItemId) -> SyncResult<()> {
        self.plan.remove_row(id).await
    }

    /// Write every pending plan edit now
    pub async fn flush_plan(&self) {
        self.plan.flush().await
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.transactions.snapshot()
    }

    pub fn formatted_transactions(&self) -> Vec<FormattedTransaction> {
        self.table.format_transactions(&self.transactions.snapshot())
    }

    pub fn plan_items(&self) -> Vec<PlanItem> {
        self.plan.items()
    }

    pub fn plan_row_state(&self, id: &PlanItemId) -> Option<SyncState> {
        self.plan.sync_state(id)
    }

    pub fn pending_plan_writes(&self) -> usize {
        self.plan.pending_writes()
    }

    /// Metrics for the current snapshots, with "this month" taken from the local clock
    pub fn summary(&self) -> BudgetSummary {
        self.summary_at(&Local::now())
    }

    pub fn summary_at(&self, now: &DateTime<Local>) -> BudgetSummary {
        self.metrics
            .summarize(&self.transactions.snapshot(), &self.plan.items(), now)
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        self.notifier.drain()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Cancel every live coalescing timer
    pub fn shutdown(&self) {
        info!("Shutting down sync engine");
        self.plan.shutdown();
    }
}

impl<R: RemoteStore> Drop for SyncEngine<R> {
    fn drop(&mut self) {
        self.plan.shutdown();
    }
}
