//! Expense Capture - device-side transaction capture
//!
//! This crate watches two device channels for financial activity and hands
//! matching items to the host app:
//!
//! - **Notifications**: posts from banking apps or containing expense wording
//! - **SMS**: new unread messages from bank senders or containing expense wording
//!
//! # Architecture
//!
//! Platform bindings deliver raw items to the capture adapters. Each adapter
//! runs a stateless classifier and pushes accepted items onto a bounded
//! channel the host consumes. The local HTTP API lives in `phone_server`.

pub mod adapters;
pub mod classifier;
pub mod config;
pub mod lifecycle;
pub mod platform;
pub mod registry;
pub mod router;
pub mod sink;
pub mod types;

// Re-export commonly used types
pub use adapters::{CaptureAdapter, NotificationAdapter, SmsAdapter};
pub use classifier::{Classifier, Verdict};
pub use config::{CaptureConfig, ClassifierConfig, Config, GeneralConfig};
pub use lifecycle::{Lifecycle, Transition};
pub use platform::{
    ChannelNotificationStream, DeviceEvent, DeviceFeed, InMemoryMessageStore, IncomingSms,
    MessageStore, NotificationFeed, NotificationStream,
};
pub use registry::{KeywordSet, BANKING_APPS, BANKING_SMS_SENDERS, EXPENSE_KEYWORDS};
pub use router::{CaptureRouter, RouterStatus};
pub use sink::EventSink;
pub use types::{
    CaptureError, Disposition, ExpenseEvent, ExtractionError, ListenerState, NotificationEvent,
    NotificationUpdate, PlatformError, RawNotification, SmsEvent, SmsRow, SourceKind,
};
