//! Capture adapters.
//!
//! Each adapter owns one platform subscription, runs the classifier on
//! every captured item and pushes accepted items to the event sink.

pub mod notification;
pub mod sms;

pub use notification::{NotificationAdapter, NotificationHandler};
pub use sms::{SmsAdapter, SmsHandler};

use crate::lifecycle::Transition;
use crate::types::{CaptureError, ListenerState, SourceKind};

/// Common surface of the capture adapters
pub trait CaptureAdapter: Send + Sync {
    /// Adapter name for log lines
    fn name(&self) -> &'static str;

    fn kind(&self) -> SourceKind;

    /// Subscribe to the platform source. Idempotent.
    fn start(&self) -> Result<Transition, CaptureError>;

    /// Unsubscribe from the platform source. Idempotent.
    fn stop(&self) -> Result<Transition, CaptureError>;

    fn state(&self) -> ListenerState;

    fn is_listening(&self) -> bool {
        self.state() == ListenerState::Listening
    }
}
