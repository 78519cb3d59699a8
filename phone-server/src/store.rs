//! Expense persistence seam behind the CRUD handlers
//!
//! The server never stores anything itself. Handlers talk to an
//! [`ExpenseStore`]; the default [`StubExpenseStore`] keeps nothing and
//! answers with canned values so the routing contract can be served
//! without a database.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Expense not found: {0}")]
    NotFound(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Expense record as exchanged with the host app
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// Merchant name
    #[serde(default, rename = "store", skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Where the expense came from ("manual", "notification", "sms")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Fields this server does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update applied by `update`
pub type ExpensePatch = Map<String, Value>;

/// CRUD interface the handler layer delegates to.
///
/// Implementations are shared across connection tasks and must pick their
/// own locking discipline.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Expense>, StoreError>;

    /// Persist a new expense and return its id
    async fn create(&self, expense: Expense) -> Result<String, StoreError>;

    async fn update(&self, id: &str, patch: ExpensePatch) -> Result<(), StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Store that persists nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct StubExpenseStore;

#[async_trait]
impl ExpenseStore for StubExpenseStore {
    async fn list(&self) -> Result<Vec<Expense>, StoreError> {
        Ok(Vec::new())
    }

    async fn create(&self, expense: Expense) -> Result<String, StoreError> {
        let id = chrono::Utc::now().timestamp_millis().to_string();
        debug!(
            "Stub store accepted expense {} ({:?})",
            id, expense.description
        );
        Ok(id)
    }

    async fn update(&self, id: &str, patch: ExpensePatch) -> Result<(), StoreError> {
        debug!("Stub store ignoring update of '{}' ({} fields)", id, patch.len());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        debug!("Stub store ignoring delete of '{}'", id);
        Ok(())
    }
}
