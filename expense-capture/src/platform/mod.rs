//! Platform seams for the capture adapters.
//!
//! The OS notification stream and the device message store sit behind
//! these traits. Bindings may invoke callbacks from any thread and
//! concurrently; adapters hold no shared mutable state in the callback path.

pub mod feed;
pub mod memory;

use crate::types::{NotificationUpdate, PlatformError, SmsRow};
use std::sync::Arc;

pub use feed::{DeviceEvent, DeviceFeed};
pub use memory::{ChannelNotificationStream, InMemoryMessageStore, IncomingSms, NotificationFeed};

/// Callback for notification stream updates
pub type NotificationCallback = Arc<dyn Fn(NotificationUpdate) + Send + Sync>;

/// Callback fired on any message store change. It carries no detail: the
/// observer cannot tell an insert from an update or an unrelated touch.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// System notification stream
pub trait NotificationStream: Send + Sync {
    fn subscribe(&self, callback: NotificationCallback) -> Result<(), PlatformError>;

    fn unsubscribe(&self) -> Result<(), PlatformError>;
}

/// Device message store
pub trait MessageStore: Send + Sync {
    fn register_observer(&self, observer: ChangeCallback) -> Result<(), PlatformError>;

    fn unregister_observer(&self) -> Result<(), PlatformError>;

    /// Most recent row with the unread flag set, by date descending, limit 1.
    /// Must not change read state.
    fn latest_unread(&self) -> Result<Option<SmsRow>, PlatformError>;
}
