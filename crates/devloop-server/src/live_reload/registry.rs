//! Registry of open reload connections.
//!
//! Each WebSocket session owns the receiving half of an unbounded channel and
//! registers the sending half here. Broadcasting pushes the reload signal into
//! every channel; a session whose socket has gone away simply fails to receive,
//! which does not affect the others.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Payload sent to every client after a completed cycle.
pub const RELOAD_SIGNAL: &str = "_";

/// Sending half of a connection's signal channel.
pub type SignalSender = mpsc::UnboundedSender<&'static str>;

/// Receiving half of a connection's signal channel.
pub type SignalReceiver = mpsc::UnboundedReceiver<&'static str>;

/// Identity of a registered connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live set of connections that receive reload signals.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: Mutex<Vec<(ConnectionId, SignalSender)>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a newly opened connection and return its identity.
    pub fn register(&self, sender: SignalSender) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, sender));
        id
    }

    /// Remove a connection by identity.
    ///
    /// Returns `false` if it was not registered, so duplicate close events are harmless.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut connections = self.lock();
        let Some(index) = connections.iter().position(|(entry, _)| *entry == id) else {
            return false;
        };
        connections.swap_remove(index);
        true
    }

    /// Send [`RELOAD_SIGNAL`] to every registered connection.
    ///
    /// Returns the number of connections the signal was delivered to.
    pub fn broadcast_reload(&self) -> usize {
        let connections = self.lock();
        let mut delivered = 0;
        for (id, sender) in connections.iter() {
            if sender.send(RELOAD_SIGNAL).is_ok() {
                delivered += 1;
            } else {
                tracing::debug!(connection = %id, "Reload signal not delivered, connection closed");
            }
        }
        delivered
    }

    /// Whether a connection is currently registered.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.lock().iter().any(|(entry, _)| *entry == id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(ConnectionId, SignalSender)>> {
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (SignalSender, SignalReceiver) {
        mpsc::unbounded_channel()
    }

    #[test]
    fn test_register_assigns_unique_ids() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();

        let a = registry.register(tx1);
        let b = registry.register(tx2);

        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
        assert!(registry.contains(a));
        assert!(registry.contains(b));
    }

    #[test]
    fn test_registered_connection_receives_every_broadcast() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = channel();
        registry.register(tx);

        assert_eq!(registry.broadcast_reload(), 1);
        assert_eq!(registry.broadcast_reload(), 1);

        assert_eq!(rx.try_recv().unwrap(), RELOAD_SIGNAL);
        assert_eq!(rx.try_recv().unwrap(), RELOAD_SIGNAL);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unregistered_connection_receives_nothing() {
        let registry = ConnectionRegistry::new();
        let (tx, mut rx) = channel();
        let id = registry.register(tx);

        assert!(registry.unregister(id));
        assert_eq!(registry.broadcast_reload(), 0);

        // Sender was dropped with the registry entry
        assert!(rx.try_recv().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let registry = ConnectionRegistry::new();
        let (tx, _rx) = channel();
        let id = registry.register(tx);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_leaves_others() {
        let registry = ConnectionRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, _rx2) = channel();
        let a = registry.register(tx1);
        let b = registry.register(tx2);
        registry.unregister(a);

        assert!(!registry.unregister(a));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(b));
    }

    #[test]
    fn test_broadcast_isolates_closed_connection() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, rx2) = channel();
        let (tx3, mut rx3) = channel();
        registry.register(tx1);
        registry.register(tx2);
        registry.register(tx3);

        drop(rx2);

        assert_eq!(registry.broadcast_reload(), 2);
        assert_eq!(rx1.try_recv().unwrap(), RELOAD_SIGNAL);
        assert_eq!(rx3.try_recv().unwrap(), RELOAD_SIGNAL);
    }

    #[test]
    fn test_close_mid_session_shrinks_registry() {
        let registry = ConnectionRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, rx2) = channel();
        registry.register(tx1);
        let closing = registry.register(tx2);
        registry.broadcast_reload();

        drop(rx2);
        registry.unregister(closing);

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.broadcast_reload(), 1);
        assert_eq!(rx1.try_recv().unwrap(), RELOAD_SIGNAL);
        assert_eq!(rx1.try_recv().unwrap(), RELOAD_SIGNAL);
    }
}
