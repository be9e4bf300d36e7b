use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use shared::{PlanItemFields, PlanItemRecord, Transaction, TransactionFields};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::RemoteFailure;

/// The two remote collections the engine synchronizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Transactions,
    MonthlyPlan,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Transactions => "transactions",
            Collection::MonthlyPlan => "monthly-plan",
        }
    }
}

/// CRUD contract of the remote persistence service.
///
/// Every call is attempted at most once; the caller decides what a failure
/// means for local state.
#[async_trait]
pub trait RemoteStore: Send + Sync + 'static {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RemoteFailure>;

    async fn create_transaction(&self, fields: &TransactionFields) -> Result<Transaction, RemoteFailure>;

    async fn update_transaction(&self, id: &str, fields: &TransactionFields) -> Result<(), RemoteFailure>;

    async fn delete_transaction(&self, id: &str) -> Result<(), RemoteFailure>;

    async fn list_plan_items(&self) -> Result<Vec<PlanItemRecord>, RemoteFailure>;

    /// Returns the created record carrying its server-assigned id
    async fn create_plan_item(&self, fields: &PlanItemFields) -> Result<PlanItemRecord, RemoteFailure>;

    async fn update_plan_item(&self, id: &str, fields: &PlanItemFields) -> Result<(), RemoteFailure>;

    async fn delete_plan_item(&self, id: &str) -> Result<(), RemoteFailure>;
}

/// HTTP client for the budget REST API
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// Create a new API client from the shared configuration
    pub fn new(config: &SyncConfig) -> Result<Self, RemoteFailure> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RemoteFailure::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Create a new API client with a custom base URL and default settings
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, RemoteFailure> {
        Self::new(&SyncConfig::default().with_base_url(base_url))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}/", self.base_url, collection.path())
    }

    fn item_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}/{}/", self.base_url, collection.path(), id)
    }

    /// `GET /{collection}/`
    pub async fn list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, RemoteFailure> {
        let url = self.collection_url(collection);
        debug!("GET {}", url);
        let response = Self::check(self.http.get(&url).send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// `POST /{collection}/`
    pub async fn create<F, T>(&self, collection: Collection, fields: &F) -> Result<T, RemoteFailure>
    where
        F: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.collection_url(collection);
        debug!("POST {}", url);
        let response = Self::check(self.http.post(&url).json(fields).send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// `PUT /{collection}/{id}/`; the response body, if any, is ignored
    pub async fn update<F>(&self, collection: Collection, id: &str, fields: &F) -> Result<(), RemoteFailure>
    where
        F: Serialize + Sync + ?Sized,
    {
        let url = self.item_url(collection, id);
        debug!("PUT {}", url);
        Self::check(self.http.put(&url).json(fields).send().await?).await?;
        Ok(())
    }

    /// `DELETE /{collection}/{id}/`
    pub async fn delete(&self, collection: Collection, id: &str) -> Result<(), RemoteFailure> {
        let url = self.item_url(collection, id);
        debug!("DELETE {}", url);
        Self::check(self.http.delete(&url).send().await?).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, RemoteFailure> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(RemoteFailure::Status { status, body })
    }
}

#[async_trait]
impl RemoteStore for ApiClient {
    async fn list_transactions(&self) -> Result<Vec<Transaction>, RemoteFailure> {
        self.list(Collection::Transactions).await
    }

    async fn create_transaction(&self, fields: &TransactionFields) -> Result<Transaction, RemoteFailure> {
        self.create(Collection::Transactions, fields).await
    }

    async fn update_transaction(&self, id: &str, fields: &TransactionFields) -> Result<(), RemoteFailure> {
        self.update(Collection::Transactions, id, fields).await
    }

    async fn delete_transaction(&self, id: &str) -> Result<(), RemoteFailure> {
        self.delete(Collection::Transactions, id).await
    }

    async fn list_plan_items(&self) -> Result<Vec<PlanItemRecord>, RemoteFailure> {
        self.list(Collection::MonthlyPlan).await
    }

    async fn create_plan_item(&self, fields: &PlanItemFields) -> Result<PlanItemRecord, RemoteFailure> {
        self.create(Collection::MonthlyPlan, fields).await
    }

    async fn update_plan_item(&self, id: &str, fields: &PlanItemFields) -> Result<(), RemoteFailure> {
        self.update(Collection::MonthlyPlan, id, fields).await
    }

    async fn delete_plan_item(&self, id: &str) -> Result<(), RemoteFailure> {
        self.delete(Collection::MonthlyPlan, id).await
    }
}
