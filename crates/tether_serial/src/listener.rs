//! # Listener Registry
//!
//! Application callbacks for engine transitions and received messages.
//!
//! Listeners are identified by `Arc` pointer identity. Registering the same
//! `Arc` twice is a no-op. Listeners are called on the event thread, from a
//! copy of the registry taken at dispatch time, so a listener may register
//! or remove listeners without deadlocking.

use parking_lot::Mutex;
use std::sync::Arc;

use tether_core::{BridgeError, BridgeResult};

use crate::status::SerialEvent;

/// Receives engine transitions.
pub trait StatusListener: Send + Sync {
    /// The engine started or stopped.
    ///
    /// # Errors
    ///
    /// Return `ListenerDisconnected` to be unregistered.
    fn on_status_changed(&self, event: SerialEvent) -> BridgeResult<()>;
}

/// Receives decoded messages.
pub trait MessageListener: Send + Sync {
    /// A message arrived.
    ///
    /// # Errors
    ///
    /// Return `ListenerDisconnected` to be unregistered.
    fn on_message_received(&self, message: &str) -> BridgeResult<()>;
}

impl<F> StatusListener for F
where
    F: Fn(SerialEvent) -> BridgeResult<()> + Send + Sync,
{
    fn on_status_changed(&self, event: SerialEvent) -> BridgeResult<()> {
        self(event)
    }
}

impl<F> MessageListener for F
where
    F: Fn(&str) -> BridgeResult<()> + Send + Sync,
{
    fn on_message_received(&self, message: &str) -> BridgeResult<()> {
        self(message)
    }
}

/// Registered status and message listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    status: Mutex<Vec<Arc<dyn StatusListener>>>,
    message: Mutex<Vec<Arc<dyn MessageListener>>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a status listener. Returns true if it is now registered.
    pub fn add_status_listener(&self, listener: Arc<dyn StatusListener>) -> bool {
        insert_unique(&self.status, listener)
    }

    /// Unregisters a status listener. Returns true if it was registered.
    pub fn remove_status_listener(&self, listener: &Arc<dyn StatusListener>) -> bool {
        remove_by_identity(&self.status, listener)
    }

    /// Registers a message listener. Returns true if it is now registered.
    pub fn add_message_listener(&self, listener: Arc<dyn MessageListener>) -> bool {
        insert_unique(&self.message, listener)
    }

    /// Unregisters a message listener. Returns true if it was registered.
    pub fn remove_message_listener(&self, listener: &Arc<dyn MessageListener>) -> bool {
        remove_by_identity(&self.message, listener)
    }

    /// Number of registered status listeners.
    #[must_use]
    pub fn status_listener_count(&self) -> usize {
        self.status.lock().len()
    }

    /// Number of registered message listeners.
    #[must_use]
    pub fn message_listener_count(&self) -> usize {
        self.message.lock().len()
    }

    /// Delivers an engine transition to every status listener.
    pub fn notify_status(&self, event: SerialEvent) {
        let listeners = self.status.lock().clone();
        for listener in &listeners {
            if let Err(e) = listener.on_status_changed(event) {
                handle_failure(&self.status, listener, &e);
            }
        }
    }

    /// Delivers a message to every message listener.
    pub fn notify_message(&self, message: &str) {
        let listeners = self.message.lock().clone();
        for listener in &listeners {
            if let Err(e) = listener.on_message_received(message) {
                handle_failure(&self.message, listener, &e);
            }
        }
    }
}

fn handle_failure<T: ?Sized>(list: &Mutex<Vec<Arc<T>>>, listener: &Arc<T>, error: &BridgeError) {
    if *error == BridgeError::ListenerDisconnected {
        tracing::warn!("Listener disconnected, removing it");
        remove_by_identity(list, listener);
    } else {
        tracing::warn!("Listener failed: {}", error);
    }
}

fn insert_unique<T: ?Sized>(list: &Mutex<Vec<Arc<T>>>, listener: Arc<T>) -> bool {
    let mut list = list.lock();
    if list.iter().any(|l| Arc::ptr_eq(l, &listener)) {
        tracing::debug!("Listener already registered");
        return true;
    }
    list.push(listener);
    true
}

fn remove_by_identity<T: ?Sized>(list: &Mutex<Vec<Arc<T>>>, listener: &Arc<T>) -> bool {
    let mut list = list.lock();
    let before = list.len();
    list.retain(|l| !Arc::ptr_eq(l, listener));
    list.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_duplicate_add_is_noop() {
        let registry = ListenerRegistry::new();
        let listener: Arc<dyn StatusListener> =
            Arc::new(|_event: SerialEvent| -> BridgeResult<()> { Ok(()) });

        assert!(registry.add_status_listener(Arc::clone(&listener)));
        assert!(registry.add_status_listener(Arc::clone(&listener)));
        assert_eq!(registry.status_listener_count(), 1);

        assert!(registry.remove_status_listener(&listener));
        assert!(!registry.remove_status_listener(&listener));
        assert_eq!(registry.status_listener_count(), 0);
    }

    #[test]
    fn test_message_fan_out() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let hits = Arc::clone(&hits);
            registry.add_message_listener(Arc::new(move |msg: &str| -> BridgeResult<()> {
                assert_eq!(msg, "PING");
                hits.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }));
        }

        registry.notify_message("PING");
        assert_eq!(hits.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_disconnected_listener_removed_others_still_called() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));

        registry.add_message_listener(Arc::new(|_msg: &str| -> BridgeResult<()> {
            Err(BridgeError::ListenerDisconnected)
        }));
        {
            let hits = Arc::clone(&hits);
            registry.add_message_listener(Arc::new(move |_msg: &str| -> BridgeResult<()> {
                hits.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }));
        }

        registry.notify_message("one");
        assert_eq!(registry.message_listener_count(), 1);
        registry.notify_message("two");
        assert_eq!(hits.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_other_errors_keep_listener() {
        let registry = ListenerRegistry::new();
        registry.add_status_listener(Arc::new(|_event: SerialEvent| -> BridgeResult<()> {
            Err(BridgeError::NotEnabled)
        }));

        registry.notify_status(SerialEvent::Started);
        assert_eq!(registry.status_listener_count(), 1);
    }
}
