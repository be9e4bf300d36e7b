//! In-memory remote used by the unit tests.

use async_trait::async_trait;
use shared::{PlanItemFields, PlanItemRecord, Transaction, TransactionFields};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::RemoteFailure;
use crate::services::RemoteStore;

/// One call made against the mock, in the order it was issued
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    ListTransactions,
    CreateTransaction(TransactionFields),
    UpdateTransaction(String, TransactionFields),
    DeleteTransaction(String),
    ListPlanItems,
    CreatePlanItem(PlanItemFields),
    UpdatePlanItem(String, PlanItemFields),
    DeletePlanItem(String),
}

impl RemoteCall {
    pub fn is_plan_call(&self) -> bool {
        matches!(
            self,
            RemoteCall::ListPlanItems
                | RemoteCall::CreatePlanItem(_)
                | RemoteCall::UpdatePlanItem(..)
                | RemoteCall::DeletePlanItem(_)
        )
    }
}

#[derive(Default)]
struct MockState {
    transactions: Vec<Transaction>,
    plan: Vec<PlanItemRecord>,
    calls: Vec<RemoteCall>,
    fail_remaining: usize,
    failing: bool,
}

/// Recording remote double.
///
/// Every call is recorded when it is issued, then held for `latency` before
/// it resolves, which is how tests model an outstanding request.
#[derive(Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transactions(self, transactions: Vec<Transaction>) -> Self {
        self.lock().transactions = transactions;
        self
    }

    pub fn with_plan(self, plan: Vec<PlanItemRecord>) -> Self {
        self.lock().plan = plan;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make the next `count` calls fail with a 500
    pub fn fail_next(&self, count: usize) {
        self.lock().fail_remaining = count;
    }

    /// Make every call fail until switched off
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    pub fn plan_calls(&self) -> Vec<RemoteCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_plan_call())
            .cloned()
            .collect()
    }

    /// Records currently held by the "server"
    pub fn plan_records(&self) -> Vec<PlanItemRecord> {
        self.lock().plan.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    async fn enter(&self, call: RemoteCall) -> Result<(), RemoteFailure> {
        let fail = {
            let mut state = self.lock();
            state.calls.push(call);
            if state.fail_remaining > 0 {
                state.fail_remaining -= 1;
                true
            } else {
                state.failing
            }
        };
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if fail {
            Err(RemoteFailure::Status {
                status: 500,
                body: "Internal Server Error".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

fn not_found(id: &str) -> RemoteFailure {
    RemoteFailure::Status {
        status: 404,
        body: format!("{} not found", id),
    }
}

#[async_trait]
impl RemoteStore for MockRemote {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RemoteFailure> {
        self.enter(RemoteCall::ListTransactions).await?;
        Ok(self.lock().transactions.clone())
    }

    async fn create_transaction(&self, fields: &TransactionFields) -> Result<Transaction, RemoteFailure> {
        self.enter(RemoteCall::CreateTransaction(fields.clone())).await?;
        let created = Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            description: fields.text.clone(),
            amount: fields.amount,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        self.lock().transactions.push(created.clone());
        Ok(created)
    }

    async fn update_transaction(&self, id: &str, fields: &TransactionFields) -> Result<(), RemoteFailure> {
        self.enter(RemoteCall::UpdateTransaction(id.to_string(), fields.clone()))
            .await?;
        let mut state = self.lock();
        let existing = state
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| not_found(id))?;
        existing.description = fields.text.clone();
        existing.amount = fields.amount;
        Ok(())
    }

    async fn delete_transaction(&self, id: &str) -> Result<(), RemoteFailure> {
        self.enter(RemoteCall::DeleteTransaction(id.to_string())).await?;
        let mut state = self.lock();
        let before = state.transactions.len();
        state.transactions.retain(|t| t.id != id);
        if state.transactions.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn list_plan_items(&self) -> Result<Vec<PlanItemRecord>, RemoteFailure> {
        self.enter(RemoteCall::ListPlanItems).await?;
        Ok(self.lock().plan.clone())
    }

    async fn create_plan_item(&self, fields: &PlanItemFields) -> Result<PlanItemRecord, RemoteFailure> {
        self.enter(RemoteCall::CreatePlanItem(fields.clone())).await?;
        let created = PlanItemRecord {
            id: uuid::Uuid::new_v4().to_string(),
            category: fields.category.clone(),
            amount: fields.amount,
        };
        self.lock().plan.push(created.clone());
        Ok(created)
    }

    async fn update_plan_item(&self, id: &str, fields: &PlanItemFields) -> Result<(), RemoteFailure> {
        self.enter(RemoteCall::UpdatePlanItem(id.to_string(), fields.clone()))
            .await?;
        let mut state = self.lock();
        let existing = state
            .plan
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| not_found(id))?;
        existing.category = fields.category.clone();
        existing.amount = fields.amount;
        Ok(())
    }

    async fn delete_plan_item(&self, id: &str) -> Result<(), RemoteFailure> {
        self.enter(RemoteCall::DeletePlanItem(id.to_string())).await?;
        let mut state = self.lock();
        let before = state.plan.len();
        state.plan.retain(|item| item.id != id);
        if state.plan.len() == before {
            return Err(not_found(id));
        }
        Ok(())
    }
}

pub fn sample_transaction(id: &str, description: &str, amount: f64, created_at: &str) -> Transaction {
    Transaction {
        id: id.to_string(),
        description: description.to_string(),
        amount,
        created_at: created_at.to_string(),
    }
}

pub fn sample_plan_item(id: &str, category: &str, amount: f64) -> PlanItemRecord {
    PlanItemRecord {
        id: id.to_string(),
        category: category.to_string(),
        amount,
    }
}
