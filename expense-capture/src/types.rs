//! Core types used throughout the capture pipeline.
//!
//! This module defines the events handed to the host app, the raw payloads
//! delivered by the platform, and the error types for each failure class.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Notification extras key holding the title
pub const EXTRA_TITLE: &str = "android.title";

/// Notification extras key holding the body text
pub const EXTRA_TEXT: &str = "android.text";

/// Which capture channel an item came through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// System notification stream
    Notification,
    /// Device message store
    Sms,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Notification => "notification",
            SourceKind::Sms => "sms",
        }
    }
}

/// Accepted notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    pub title: String,
    pub text: String,
    /// Package identifier of the posting app
    pub package_name: String,
    /// Capture time in epoch milliseconds
    pub timestamp: i64,
}

/// Accepted SMS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsEvent {
    pub sender: String,
    pub body: String,
    /// Message date from the store, epoch milliseconds
    pub timestamp: i64,
}

/// Normalized record emitted to the host app. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ExpenseEvent {
    #[serde(rename = "NotificationReceived")]
    Notification(NotificationEvent),
    #[serde(rename = "SMSReceived")]
    Sms(SmsEvent),
}

impl ExpenseEvent {
    pub const NOTIFICATION_RECEIVED: &'static str = "NotificationReceived";
    pub const SMS_RECEIVED: &'static str = "SMSReceived";

    /// Event name the host app subscribes to
    pub fn name(&self) -> &'static str {
        match self {
            ExpenseEvent::Notification(_) => Self::NOTIFICATION_RECEIVED,
            ExpenseEvent::Sms(_) => Self::SMS_RECEIVED,
        }
    }

    pub fn source_kind(&self) -> SourceKind {
        match self {
            ExpenseEvent::Notification(_) => SourceKind::Notification,
            ExpenseEvent::Sms(_) => SourceKind::Sms,
        }
    }

    pub fn captured_at_millis(&self) -> i64 {
        match self {
            ExpenseEvent::Notification(e) => e.timestamp,
            ExpenseEvent::Sms(e) => e.timestamp,
        }
    }

    /// Flat string/number map as delivered across the host bridge
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        match self {
            ExpenseEvent::Notification(e) => {
                map.insert("title".into(), Value::from(e.title.as_str()));
                map.insert("text".into(), Value::from(e.text.as_str()));
                map.insert("packageName".into(), Value::from(e.package_name.as_str()));
                map.insert("timestamp".into(), Value::from(e.timestamp));
            }
            ExpenseEvent::Sms(e) => {
                map.insert("sender".into(), Value::from(e.sender.as_str()));
                map.insert("body".into(), Value::from(e.body.as_str()));
                map.insert("timestamp".into(), Value::from(e.timestamp));
            }
        }
        map
    }
}

/// Notification as delivered by the platform. Nothing in it is trusted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl RawNotification {
    /// Build a well-formed payload with title and text extras
    pub fn new(package_name: &str, title: &str, text: &str) -> Self {
        let mut extras = Map::new();
        extras.insert(EXTRA_TITLE.into(), Value::from(title));
        extras.insert(EXTRA_TEXT.into(), Value::from(text));
        Self {
            package_name: Some(package_name.to_string()),
            extras,
        }
    }
}

/// What the notification stream reports
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationUpdate {
    Posted(RawNotification),
    Removed(RawNotification),
}

/// Row returned by a message store query. Columns may be null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRow {
    pub id: i64,
    pub address: Option<String>,
    pub body: Option<String>,
    /// Epoch milliseconds
    pub date: i64,
}

/// Lifecycle state of a capture adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerState {
    Idle,
    Listening,
}

/// What happened to one captured item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Classified as expense-related and pushed to the sink
    Forwarded,
    /// Classified as unrelated
    Rejected,
    /// Lost to an extraction error or a full/closed sink
    Dropped,
    /// Store change with no unread message behind it
    Empty,
}

/// Failures reported by a platform binding
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Observer already registered")]
    AlreadyRegistered,

    #[error("No observer registered")]
    NotRegistered,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Platform unavailable: {0}")]
    Unavailable(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Errors while pulling fields out of a captured item
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Malformed field {field}: {reason}")]
    MalformedField { field: &'static str, reason: String },

    #[error("Message store query failed: {0}")]
    Store(#[source] PlatformError),
}

/// Errors surfaced by adapter start/stop
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to register {adapter} listener: {source}")]
    Registration {
        adapter: &'static str,
        #[source]
        source: PlatformError,
    },

    #[error("Failed to deregister {adapter} listener: {source}")]
    Deregistration {
        adapter: &'static str,
        #[source]
        source: PlatformError,
    },
}
