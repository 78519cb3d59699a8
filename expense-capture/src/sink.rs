//! Delivery boundary between capture and the host app.
//!
//! Adapters push onto a bounded channel and never wait: a full or closed
//! channel loses the event.

use crate::types::ExpenseEvent;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

/// Cloneable producer half handed to every adapter
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ExpenseEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ExpenseEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver the host consumes from
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ExpenseEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Push without blocking. Returns whether the event was accepted.
    pub fn push(&self, event: ExpenseEvent) -> bool {
        let name = event.name();
        match self.tx.try_send(event) {
            Ok(()) => {
                debug!("Emitted {}", name);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Event sink full, dropping {}", name);
                false
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Event sink closed, dropping {}", name);
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
