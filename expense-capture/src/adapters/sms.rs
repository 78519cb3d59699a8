//! SMS capture.
//!
//! The message store only says that something changed. Every change
//! re-queries the newest unread message, so a burst of inserts may forward
//! the same message more than once or skip one.

use super::CaptureAdapter;
use crate::classifier::Classifier;
use crate::lifecycle::{Lifecycle, Transition};
use crate::platform::MessageStore;
use crate::sink::EventSink;
use crate::types::{
    CaptureError, Disposition, ExpenseEvent, ExtractionError, ListenerState, SmsEvent, SmsRow,
    SourceKind,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turn a store row into an event, rejecting null columns
pub fn extract(row: SmsRow) -> Result<SmsEvent, ExtractionError> {
    let sender = row.address.ok_or(ExtractionError::MissingField("address"))?;
    let body = row.body.ok_or(ExtractionError::MissingField("body"))?;
    Ok(SmsEvent {
        sender,
        body,
        timestamp: row.date,
    })
}

/// Runs on every store change
pub struct SmsHandler {
    store: Arc<dyn MessageStore>,
    classifier: Classifier,
    sink: EventSink,
}

impl SmsHandler {
    pub fn new(store: Arc<dyn MessageStore>, classifier: Classifier, sink: EventSink) -> Self {
        Self {
            store,
            classifier,
            sink,
        }
    }

    pub fn on_change(&self) -> Disposition {
        let row = match self.store.latest_unread() {
            Ok(Some(row)) => row,
            Ok(None) => {
                debug!("Message store changed with no unread message");
                return Disposition::Empty;
            }
            Err(e) => {
                warn!("Dropping SMS: {}", ExtractionError::Store(e));
                return Disposition::Dropped;
            }
        };

        let id = row.id;
        let event = match extract(row) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping SMS {}: {}", id, e);
                return Disposition::Dropped;
            }
        };

        let verdict = self.classifier.classify(&event.sender, &event.body);
        if !verdict.should_forward() {
            debug!("Ignoring SMS {} from {}", id, event.sender);
            return Disposition::Rejected;
        }

        info!("Expense SMS {} from {} ({})", id, event.sender, verdict.reason());
        if self.sink.push(ExpenseEvent::Sms(event)) {
            Disposition::Forwarded
        } else {
            Disposition::Dropped
        }
    }
}

/// Observes the device message store
pub struct SmsAdapter {
    store: Arc<dyn MessageStore>,
    handler: Arc<SmsHandler>,
    lifecycle: Lifecycle,
}

impl SmsAdapter {
    pub const NAME: &'static str = "SMS";

    pub fn new(store: Arc<dyn MessageStore>, classifier: Classifier, sink: EventSink) -> Self {
        Self {
            handler: Arc::new(SmsHandler::new(Arc::clone(&store), classifier, sink)),
            store,
            lifecycle: Lifecycle::new(Self::NAME),
        }
    }

    pub fn handler(&self) -> &Arc<SmsHandler> {
        &self.handler
    }
}

impl CaptureAdapter for SmsAdapter {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Sms
    }

    fn start(&self) -> Result<Transition, CaptureError> {
        self.lifecycle.start(|| {
            let handler = Arc::clone(&self.handler);
            self.store.register_observer(Arc::new(move || {
                handler.on_change();
            }))
        })
    }

    fn stop(&self) -> Result<Transition, CaptureError> {
        self.lifecycle.stop(|| self.store.unregister_observer())
    }

    fn state(&self) -> ListenerState {
        self.lifecycle.state()
    }
}

impl Drop for SmsAdapter {
    fn drop(&mut self) {
        // The registered observer holds the store; unregistering breaks the cycle
        if self.lifecycle.is_listening() {
            let _ = self.stop();
        }
    }
}
