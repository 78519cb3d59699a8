//! Idempotent start/stop guard shared by the capture adapters.

use crate::types::{CaptureError, ListenerState, PlatformError};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info};

/// Result of a start or stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Started,
    AlreadyListening,
    Stopped,
    NotListening,
}

/// Listener state for one adapter.
///
/// The lock is held across register/deregister so concurrent start and
/// stop calls cannot interleave.
#[derive(Debug)]
pub struct Lifecycle {
    name: &'static str,
    state: Mutex<ListenerState>,
}

impl Lifecycle {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(ListenerState::Idle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> ListenerState {
        *self.lock()
    }

    pub fn is_listening(&self) -> bool {
        self.state() == ListenerState::Listening
    }

    /// Run `register` and move to `Listening`, unless already there.
    /// A failed registration leaves the state `Idle`.
    pub fn start<F>(&self, register: F) -> Result<Transition, CaptureError>
    where
        F: FnOnce() -> Result<(), PlatformError>,
    {
        let mut state = self.lock();
        if *state == ListenerState::Listening {
            debug!("{} listener already started", self.name);
            return Ok(Transition::AlreadyListening);
        }

        register().map_err(|source| {
            error!("Error starting {} listener: {}", self.name, source);
            CaptureError::Registration {
                adapter: self.name,
                source,
            }
        })?;

        *state = ListenerState::Listening;
        info!("{} listener started", self.name);
        Ok(Transition::Started)
    }

    /// Run `deregister` and move to `Idle`, unless already there.
    /// A failed deregistration leaves the state `Listening`.
    pub fn stop<F>(&self, deregister: F) -> Result<Transition, CaptureError>
    where
        F: FnOnce() -> Result<(), PlatformError>,
    {
        let mut state = self.lock();
        if *state == ListenerState::Idle {
            debug!("{} listener not started", self.name);
            return Ok(Transition::NotListening);
        }

        deregister().map_err(|source| {
            error!("Error stopping {} listener: {}", self.name, source);
            CaptureError::Deregistration {
                adapter: self.name,
                source,
            }
        })?;

        *state = ListenerState::Idle;
        info!("{} listener stopped", self.name);
        Ok(Transition::Stopped)
    }

    fn lock(&self) -> MutexGuard<'_, ListenerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_starts_idle() {
        let lifecycle = Lifecycle::new("Test");
        assert_eq!(lifecycle.state(), ListenerState::Idle);
        assert_eq!(lifecycle.name(), "Test");
    }

    #[test]
    fn test_double_start_registers_once() {
        let lifecycle = Lifecycle::new("Test");
        let calls = AtomicUsize::new(0);
        let register = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        assert_eq!(lifecycle.start(register).unwrap(), Transition::Started);
        assert_eq!(lifecycle.start(register).unwrap(), Transition::AlreadyListening);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(lifecycle.is_listening());
    }

    #[test]
    fn test_double_stop_deregisters_once() {
        let lifecycle = Lifecycle::new("Test");
        let calls = AtomicUsize::new(0);
        let deregister = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        assert_eq!(lifecycle.stop(deregister).unwrap(), Transition::NotListening);
        lifecycle.start(|| Ok(())).unwrap();
        assert_eq!(lifecycle.stop(deregister).unwrap(), Transition::Stopped);
        assert_eq!(lifecycle.stop(deregister).unwrap(), Transition::NotListening);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), ListenerState::Idle);
    }

    #[test]
    fn test_failed_registration_stays_idle() {
        let lifecycle = Lifecycle::new("Test");
        let err = lifecycle
            .start(|| Err(PlatformError::PermissionDenied("READ_SMS".into())))
            .unwrap_err();

        assert!(matches!(err, CaptureError::Registration { adapter: "Test", .. }));
        assert_eq!(lifecycle.state(), ListenerState::Idle);

        // A later attempt can still succeed
        assert_eq!(lifecycle.start(|| Ok(())).unwrap(), Transition::Started);
    }

    #[test]
    fn test_failed_deregistration_stays_listening() {
        let lifecycle = Lifecycle::new("Test");
        lifecycle.start(|| Ok(())).unwrap();

        let err = lifecycle
            .stop(|| Err(PlatformError::Unavailable("service died".into())))
            .unwrap_err();
        assert!(matches!(err, CaptureError::Deregistration { .. }));
        assert!(lifecycle.is_listening());
    }

    #[test]
    fn test_concurrent_starts_register_once() {
        let lifecycle = Arc::new(Lifecycle::new("Test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let lifecycle = Arc::clone(&lifecycle);
                let calls = Arc::clone(&calls);
                std::thread::spawn(move || {
                    lifecycle
                        .start(|| {
                            calls.fetch_add(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap()
                })
            })
            .collect();

        let started = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|t| *t == Transition::Started)
            .count();

        assert_eq!(started, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
