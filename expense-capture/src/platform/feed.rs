//! JSON-lines device feed.
//!
//! Each line describes one device event and is applied to the in-process
//! bindings:
//!
//! ```text
//! {"kind":"notification","packageName":"com.fnb.android","extras":{"android.title":"Purchase"}}
//! {"kind":"notification_removed","packageName":"com.fnb.android"}
//! {"kind":"sms","address":"FNB","body":"R150 spent","date":1700000000000}
//! {"kind":"sms_read","id":1}
//! ```

use super::memory::{InMemoryMessageStore, IncomingSms, NotificationFeed};
use crate::types::RawNotification;
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, error, info, warn};

/// One event reported by the device
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeviceEvent {
    Notification(RawNotification),
    NotificationRemoved(RawNotification),
    Sms {
        #[serde(default)]
        address: Option<String>,
        #[serde(default)]
        body: Option<String>,
        /// Epoch milliseconds, defaults to arrival time
        #[serde(default)]
        date: Option<i64>,
    },
    SmsRead {
        id: i64,
    },
}

/// Applies device events to the in-process notification stream and
/// message store
#[derive(Clone)]
pub struct DeviceFeed {
    notifications: NotificationFeed,
    messages: Arc<InMemoryMessageStore>,
}

impl DeviceFeed {
    pub fn new(notifications: NotificationFeed, messages: Arc<InMemoryMessageStore>) -> Self {
        Self {
            notifications,
            messages,
        }
    }

    pub fn apply(&self, event: DeviceEvent) {
        match event {
            DeviceEvent::Notification(raw) => {
                if !self.notifications.post(raw) {
                    debug!("Notification arrived while capture is stopped");
                }
            }
            DeviceEvent::NotificationRemoved(raw) => {
                self.notifications.remove(raw);
            }
            DeviceEvent::Sms {
                address,
                body,
                date,
            } => {
                let date = date.unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
                self.messages.insert(IncomingSms {
                    address,
                    body,
                    date,
                });
            }
            DeviceEvent::SmsRead { id } => {
                if !self.messages.mark_read(id) {
                    debug!("No stored SMS with id {}", id);
                }
            }
        }
    }

    /// Parse and apply one line. Blank lines are ignored; malformed lines
    /// are logged and skipped. Returns whether an event was applied.
    pub fn apply_line(&self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return false;
        }

        match serde_json::from_str::<DeviceEvent>(line) {
            Ok(event) => {
                self.apply(event);
                true
            }
            Err(e) => {
                warn!("Skipping malformed device event: {}", e);
                false
            }
        }
    }

    /// Apply lines from `reader` until `shutdown` resolves. The end of the
    /// input does not end the run. Returns the number of applied events.
    pub async fn run<R, S>(&self, reader: R, shutdown: S) -> usize
    where
        R: AsyncBufRead + Unpin,
        S: Future<Output = ()>,
    {
        let mut lines = reader.lines();
        let mut applied = 0;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            if self.apply_line(&line) {
                                applied += 1;
                            }
                            continue;
                        }
                        Ok(None) => info!("Device feed closed, waiting for shutdown"),
                        Err(e) => error!("Failed to read device feed: {}", e),
                    }
                    (&mut shutdown).await;
                    return applied;
                }
                _ = &mut shutdown => return applied,
            }
        }
    }
}
