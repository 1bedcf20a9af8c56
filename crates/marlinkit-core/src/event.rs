//! Protocol listener interface
//!
//! Defines the listener trait for session diagnostics and the registry the
//! session dispatches through. Listeners are optional; an unobserved session
//! behaves identically.

use crate::state::SessionState;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Handle for a registered protocol listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe
/// from session events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub String);

/// Listener trait for session events
///
/// Implement this trait to observe the wire traffic and lifecycle of a
/// session. All methods have empty defaults so implementors pick only the
/// events they care about.
pub trait ProtocolListener: Send + Sync {
    /// Called when the session lifecycle state changes
    fn on_state_changed(&self, _from: SessionState, _to: SessionState) {}

    /// Called for every line written to the device, before the newline
    fn on_command_sent(&self, _line: &str) {}

    /// Called for every complete line read from the device
    fn on_line_received(&self, _line: &str) {}

    /// Called when a line is discarded while waiting for an acknowledgment
    fn on_noise_discarded(&self, _line: &str) {}

    /// Called for degraded-but-continuing conditions, such as an
    /// unverifiable relative move
    fn on_advisory(&self, _message: &str) {}
}

/// Registry of protocol listeners keyed by subscription handle
#[derive(Default)]
pub struct ListenerSet {
    listeners: RwLock<HashMap<ListenerHandle, Arc<dyn ProtocolListener>>>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener and return its subscription handle
    pub fn register(&self, listener: Arc<dyn ProtocolListener>) -> ListenerHandle {
        let handle = ListenerHandle(Uuid::new_v4().to_string());
        self.listeners.write().insert(handle.clone(), listener);
        tracing::debug!("Listener {} registered", handle.0);
        handle
    }

    /// Remove a listener; returns false for an unknown handle
    pub fn unregister(&self, handle: &ListenerHandle) -> bool {
        let removed = self.listeners.write().remove(handle).is_some();
        if removed {
            tracing::debug!("Listener {} removed", handle.0);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Invoke `f` for every registered listener
    pub fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn ProtocolListener),
    {
        for listener in self.listeners.read().values() {
            f(listener.as_ref());
        }
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("count", &self.len())
            .finish()
    }
}
