//! In-process platform bindings.
//!
//! Used when the host receives device events itself (for example over a
//! bridge or stdin) and needs to feed them to the adapters.

use super::{ChangeCallback, MessageStore, NotificationCallback, NotificationStream};
use crate::types::{NotificationUpdate, PlatformError, RawNotification, SmsRow};
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct StreamInner {
    callback: Mutex<Option<NotificationCallback>>,
    subscriptions: Mutex<usize>,
}

/// Notification stream fed by the host through a [`NotificationFeed`]
#[derive(Default, Clone)]
pub struct ChannelNotificationStream {
    inner: Arc<StreamInner>,
}

impl ChannelNotificationStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the host uses to deliver notifications
    pub fn feed(&self) -> NotificationFeed {
        NotificationFeed {
            inner: Arc::clone(&self.inner),
        }
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.inner.callback).is_some()
    }

    /// Number of successful subscriptions so far
    pub fn subscription_count(&self) -> usize {
        *lock(&self.inner.subscriptions)
    }
}

impl NotificationStream for ChannelNotificationStream {
    fn subscribe(&self, callback: NotificationCallback) -> Result<(), PlatformError> {
        let mut slot = lock(&self.inner.callback);
        if slot.is_some() {
            return Err(PlatformError::AlreadyRegistered);
        }
        *slot = Some(callback);
        *lock(&self.inner.subscriptions) += 1;
        Ok(())
    }

    fn unsubscribe(&self) -> Result<(), PlatformError> {
        lock(&self.inner.callback)
            .take()
            .map(|_| ())
            .ok_or(PlatformError::NotRegistered)
    }
}

/// Producer side of a [`ChannelNotificationStream`]
#[derive(Clone)]
pub struct NotificationFeed {
    inner: Arc<StreamInner>,
}

impl NotificationFeed {
    /// Deliver a posted notification. Returns false when nobody listens.
    pub fn post(&self, notification: RawNotification) -> bool {
        self.deliver(NotificationUpdate::Posted(notification))
    }

    /// Deliver a removal. Returns false when nobody listens.
    pub fn remove(&self, notification: RawNotification) -> bool {
        self.deliver(NotificationUpdate::Removed(notification))
    }

    fn deliver(&self, update: NotificationUpdate) -> bool {
        // Clone the callback out so it runs without the slot locked
        let callback = lock(&self.inner.callback).clone();
        match callback {
            Some(callback) => {
                callback(update);
                true
            }
            None => {
                trace!("No notification subscriber, discarding update");
                false
            }
        }
    }
}

/// New message to place in an [`InMemoryMessageStore`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IncomingSms {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    /// Epoch milliseconds
    pub date: i64,
}

impl IncomingSms {
    pub fn new(address: &str, body: &str, date: i64) -> Self {
        Self {
            address: Some(address.to_string()),
            body: Some(body.to_string()),
            date,
        }
    }
}

#[derive(Default)]
struct StoreInner {
    /// Unread messages only
    rows: Vec<SmsRow>,
    next_id: i64,
    observer: Option<ChangeCallback>,
    registrations: usize,
}

/// Message store held in memory. Only unread messages are kept; marking
/// one read releases it. Every insert or read fires the registered
/// observer.
#[derive(Default)]
pub struct InMemoryMessageStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an unread message and notify the observer. Returns the row id.
    pub fn insert(&self, message: IncomingSms) -> i64 {
        let (id, observer) = {
            let mut inner = lock(&self.inner);
            inner.next_id += 1;
            let id = inner.next_id;
            inner.rows.push(SmsRow {
                id,
                address: message.address,
                body: message.body,
                date: message.date,
            });
            (id, inner.observer.clone())
        };

        debug!("Stored SMS {}", id);
        notify(observer);
        id
    }

    /// Mark a message read, dropping it from the store, and notify the
    /// observer. Returns false for unknown or already read ids.
    pub fn mark_read(&self, id: i64) -> bool {
        let (found, observer) = {
            let mut inner = lock(&self.inner);
            let before = inner.rows.len();
            inner.rows.retain(|row| row.id != id);
            (inner.rows.len() < before, inner.observer.clone())
        };

        if found {
            notify(observer);
        }
        found
    }

    /// Fire the observer without changing anything
    pub fn touch(&self) {
        let observer = lock(&self.inner).observer.clone();
        notify(observer);
    }

    pub fn unread_count(&self) -> usize {
        lock(&self.inner).rows.len()
    }

    pub fn has_observer(&self) -> bool {
        lock(&self.inner).observer.is_some()
    }

    /// Number of successful observer registrations so far
    pub fn registration_count(&self) -> usize {
        lock(&self.inner).registrations
    }
}

fn notify(observer: Option<ChangeCallback>) {
    if let Some(observer) = observer {
        observer();
    }
}

impl MessageStore for InMemoryMessageStore {
    fn register_observer(&self, observer: ChangeCallback) -> Result<(), PlatformError> {
        let mut inner = lock(&self.inner);
        if inner.observer.is_some() {
            return Err(PlatformError::AlreadyRegistered);
        }
        inner.observer = Some(observer);
        inner.registrations += 1;
        Ok(())
    }

    fn unregister_observer(&self) -> Result<(), PlatformError> {
        lock(&self.inner)
            .observer
            .take()
            .map(|_| ())
            .ok_or(PlatformError::NotRegistered)
    }

    fn latest_unread(&self) -> Result<Option<SmsRow>, PlatformError> {
        let inner = lock(&self.inner);
        Ok(inner
            .rows
            .iter()
            .max_by_key(|row| (row.date, row.id))
            .cloned())
    }
}
