//! JSON bodies returned by the local API

use serde::{Deserialize, Serialize};

/// Status word carried by every successful response body
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Created,
    Updated,
    Deleted,
}

/// `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: ActionStatus,
    /// Server clock in epoch milliseconds
    pub timestamp: i64,
}

impl HealthResponse {
    pub fn now() -> Self {
        Self {
            status: ActionStatus::Ok,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// `POST /api/expenses`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatedResponse {
    pub id: String,
    pub status: ActionStatus,
}

impl CreatedResponse {
    pub fn new(id: String) -> Self {
        Self {
            id,
            status: ActionStatus::Created,
        }
    }
}

/// Bodies that only report what happened (`PUT`/`DELETE`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub status: ActionStatus,
}

impl StatusResponse {
    pub fn updated() -> Self {
        Self {
            status: ActionStatus::Updated,
        }
    }

    pub fn deleted() -> Self {
        Self {
            status: ActionStatus::Deleted,
        }
    }
}

/// Error body shared by 404/405/500
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn not_found() -> Self {
        Self::new("Not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new("Method not allowed")
    }

    pub fn internal() -> Self {
        Self::new("Internal server error")
    }

    fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}
