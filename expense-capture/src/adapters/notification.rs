//! Notification capture.

use super::CaptureAdapter;
use crate::classifier::Classifier;
use crate::lifecycle::{Lifecycle, Transition};
use crate::platform::NotificationStream;
use crate::sink::EventSink;
use crate::types::{
    CaptureError, Disposition, ExpenseEvent, ExtractionError, ListenerState, NotificationEvent,
    NotificationUpdate, RawNotification, SourceKind, EXTRA_TEXT, EXTRA_TITLE,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fields pulled out of a raw notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedNotification {
    pub package_name: String,
    pub title: String,
    pub text: String,
}

impl ExtractedNotification {
    /// Text the vocabulary test runs on
    pub fn combined_text(&self) -> String {
        format!("{} {}", self.title, self.text)
    }
}

/// Pull the package name, title and text out of an untrusted payload
pub fn extract(raw: &RawNotification) -> Result<ExtractedNotification, ExtractionError> {
    let package_name = raw
        .package_name
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ExtractionError::MissingField("packageName"))?;

    Ok(ExtractedNotification {
        package_name: package_name.to_string(),
        title: extra_string(&raw.extras, EXTRA_TITLE)?,
        text: extra_string(&raw.extras, EXTRA_TEXT)?,
    })
}

fn extra_string(extras: &Map<String, Value>, key: &'static str) -> Result<String, ExtractionError> {
    match extras.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ExtractionError::MalformedField {
            field: key,
            reason: format!("expected a string, got {}", other),
        }),
    }
}

/// Per-notification processing. Holds no mutable state so the stream may
/// call it from any thread.
pub struct NotificationHandler {
    classifier: Classifier,
    sink: EventSink,
}

impl NotificationHandler {
    pub fn new(classifier: Classifier, sink: EventSink) -> Self {
        Self { classifier, sink }
    }

    pub fn handle(&self, update: NotificationUpdate) -> Disposition {
        match update {
            NotificationUpdate::Posted(raw) => self.on_posted(&raw),
            NotificationUpdate::Removed(raw) => {
                debug!(
                    "Notification removed: {}",
                    raw.package_name.as_deref().unwrap_or("<unknown>")
                );
                Disposition::Rejected
            }
        }
    }

    fn on_posted(&self, raw: &RawNotification) -> Disposition {
        let fields = match extract(raw) {
            Ok(fields) => fields,
            Err(e) => {
                warn!("Dropping notification: {}", e);
                return Disposition::Dropped;
            }
        };

        let verdict = self
            .classifier
            .classify(&fields.package_name, &fields.combined_text());
        if !verdict.should_forward() {
            debug!("Ignoring notification from {}", fields.package_name);
            return Disposition::Rejected;
        }

        info!(
            "Expense notification from {} ({})",
            fields.package_name,
            verdict.reason()
        );
        let event = ExpenseEvent::Notification(NotificationEvent {
            title: fields.title,
            text: fields.text,
            package_name: fields.package_name,
            timestamp: chrono::Utc::now().timestamp_millis(),
        });

        if self.sink.push(event) {
            Disposition::Forwarded
        } else {
            Disposition::Dropped
        }
    }
}

/// Subscribes to the system notification stream
pub struct NotificationAdapter {
    stream: Arc<dyn NotificationStream>,
    handler: Arc<NotificationHandler>,
    lifecycle: Lifecycle,
}

impl NotificationAdapter {
    pub const NAME: &'static str = "Notification";

    pub fn new(
        stream: Arc<dyn NotificationStream>,
        classifier: Classifier,
        sink: EventSink,
    ) -> Self {
        Self {
            stream,
            handler: Arc::new(NotificationHandler::new(classifier, sink)),
            lifecycle: Lifecycle::new(Self::NAME),
        }
    }

    pub fn handler(&self) -> &Arc<NotificationHandler> {
        &self.handler
    }
}

impl CaptureAdapter for NotificationAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Notification
    }

    fn start(&self) -> Result<Transition, CaptureError> {
        self.lifecycle.start(|| {
            let handler = Arc::clone(&self.handler);
            self.stream.subscribe(Arc::new(move |update| {
                handler.handle(update);
            }))
        })
    }

    fn stop(&self) -> Result<Transition, CaptureError> {
        self.lifecycle.stop(|| self.stream.unsubscribe())
    }

    fn state(&self) -> ListenerState {
        self.lifecycle.state()
    }
}

impl Drop for NotificationAdapter {
    fn drop(&mut self) {
        if self.lifecycle.is_listening() {
            let _ = self.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClassifierConfig;
    use crate::platform::ChannelNotificationStream;
    use serde_json::json;

    fn handler() -> (NotificationHandler, tokio::sync::mpsc::Receiver<ExpenseEvent>) {
        let (sink, rx) = EventSink::channel(8);
        let classifier = Classifier::for_notifications(&ClassifierConfig::default());
        (NotificationHandler::new(classifier, sink), rx)
    }

    #[test]
    fn test_extract_missing_extras_are_empty() {
        let raw = RawNotification {
            package_name: Some("com.fnb.android".into()),
            extras: Map::new(),
        };
        let fields = extract(&raw).unwrap();
        assert_eq!(fields.title, "");
        assert_eq!(fields.text, "");
        assert_eq!(fields.combined_text(), " ");
    }

    #[test]
    fn test_extract_rejects_bad_payloads() {
        let no_package = RawNotification::default();
        assert!(matches!(
            extract(&no_package),
            Err(ExtractionError::MissingField("packageName"))
        ));

        let blank_package = RawNotification::new("  ", "Payment", "R 5");
        assert!(matches!(
            extract(&blank_package),
            Err(ExtractionError::MissingField(_))
        ));

        let mut numeric_title = RawNotification::new("com.fnb.android", "", "");
        numeric_title.extras.insert(EXTRA_TITLE.into(), json!(42));
        assert!(matches!(
            extract(&numeric_title),
            Err(ExtractionError::MalformedField { field: EXTRA_TITLE, .. })
        ));
    }

    #[test]
    fn test_forwarded_notification() {
        let (handler, mut rx) = handler();
        let raw = RawNotification::new("com.fnb.android", "Payment", "R 150.00 debited");

        assert_eq!(handler.handle(NotificationUpdate::Posted(raw)), Disposition::Forwarded);
        match rx.try_recv().unwrap() {
            ExpenseEvent::Notification(event) => {
                assert_eq!(event.package_name, "com.fnb.android");
                assert_eq!(event.title, "Payment");
                assert_eq!(event.text, "R 150.00 debited");
                assert!(event.timestamp > 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_vocabulary_spans_title_and_text() {
        let (handler, mut rx) = handler();
        // Only the title carries the keyword
        let raw = RawNotification::new("com.shop.app", "Purchase confirmed", "Thanks!");
        assert_eq!(handler.handle(NotificationUpdate::Posted(raw)), Disposition::Forwarded);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_unrelated_notification_rejected() {
        let (handler, mut rx) = handler();
        let raw = RawNotification::new("com.whatsapp", "Mom", "See you at 6");
        assert_eq!(handler.handle(NotificationUpdate::Posted(raw)), Disposition::Rejected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_removal_ignored() {
        let (handler, mut rx) = handler();
        let raw = RawNotification::new("com.fnb.android", "Payment", "R 150.00");
        assert_eq!(handler.handle(NotificationUpdate::Removed(raw)), Disposition::Rejected);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let stream = Arc::new(ChannelNotificationStream::new());
        let (sink, _rx) = EventSink::channel(8);
        let adapter = NotificationAdapter::new(
            stream.clone(),
            Classifier::for_notifications(&ClassifierConfig::default()),
            sink,
        );

        adapter.start().unwrap();
        assert!(stream.is_subscribed());
        drop(adapter);
        assert!(!stream.is_subscribed());
    }
}
