//! Capture orchestration.
//!
//! Builds the per-channel classifiers and adapters from configuration and
//! drives their start/stop together.

use crate::adapters::{CaptureAdapter, NotificationAdapter, SmsAdapter};
use crate::classifier::Classifier;
use crate::config::Config;
use crate::platform::{MessageStore, NotificationStream};
use crate::sink::EventSink;
use crate::types::{ListenerState, SourceKind};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Owns the capture adapters
pub struct CaptureRouter {
    notifications: NotificationAdapter,
    sms: SmsAdapter,
    notifications_enabled: bool,
    sms_enabled: bool,
}

impl CaptureRouter {
    pub fn new(
        config: &Config,
        stream: Arc<dyn NotificationStream>,
        store: Arc<dyn MessageStore>,
        sink: EventSink,
    ) -> Self {
        let notifications = NotificationAdapter::new(
            stream,
            Classifier::for_kind(SourceKind::Notification, &config.classifier),
            sink.clone(),
        );
        let sms = SmsAdapter::new(
            store,
            Classifier::for_kind(SourceKind::Sms, &config.classifier),
            sink,
        );

        Self {
            notifications,
            sms,
            notifications_enabled: config.capture.notifications_enabled,
            sms_enabled: config.capture.sms_enabled,
        }
    }

    /// Start every enabled adapter. A failing adapter is logged and left
    /// idle; the others still start. Returns how many are listening.
    pub fn start(&self) -> usize {
        info!("Starting capture");

        for (adapter, enabled) in self.adapters() {
            if !enabled {
                info!("{} capture disabled in configuration", adapter.name());
                continue;
            }
            if let Err(e) = adapter.start() {
                warn!("{} capture unavailable: {}", adapter.name(), e);
            }
        }

        let listening = self
            .adapters()
            .into_iter()
            .filter(|(adapter, _)| adapter.is_listening())
            .count();
        info!("Capture running with {} listener(s)", listening);
        listening
    }

    /// Stop every listening adapter
    pub fn shutdown(&self) {
        for (adapter, _) in self.adapters() {
            if let Err(e) = adapter.stop() {
                error!("{}", e);
            }
        }
        info!("Capture stopped");
    }

    pub fn status(&self) -> RouterStatus {
        RouterStatus {
            notifications: self.notifications.state(),
            sms: self.sms.state(),
        }
    }

    pub fn notification_adapter(&self) -> &NotificationAdapter {
        &self.notifications
    }

    pub fn sms_adapter(&self) -> &SmsAdapter {
        &self.sms
    }

    fn adapters(&self) -> [(&dyn CaptureAdapter, bool); 2] {
        [
            (&self.notifications, self.notifications_enabled),
            (&self.sms, self.sms_enabled),
        ]
    }
}

/// Listener state per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouterStatus {
    pub notifications: ListenerState,
    pub sms: ListenerState,
}
