//! Open-connection accounting for the drain.
//!
//! Every accepted connection holds a [`ConnectionGuard`]; the tracker knows
//! how many are open, which is what a forced drain reports.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Identifier of a connection, unique within its tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Shared count of open connections. Clones observe the same count.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    shared: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    next_id: AtomicU64,
    active: AtomicU64,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a newly accepted connection until the guard is dropped.
    pub fn track(&self) -> ConnectionGuard {
        let id = ConnectionId(self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let active = self.shared.active.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_active_connections(active);
        tracing::trace!(connection_id = %id, active, "Connection opened");
        ConnectionGuard {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    pub fn active_count(&self) -> u64 {
        self.shared.active.load(Ordering::SeqCst)
    }
}

/// Held by a connection task for as long as the connection is open.
#[derive(Debug)]
pub struct ConnectionGuard {
    shared: Arc<Shared>,
    id: ConnectionId,
}

impl ConnectionGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let remaining = self.shared.active.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_active_connections(remaining);
        tracing::trace!(connection_id = %self.id, remaining, "Connection closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guards_are_counted_until_dropped() {
        let tracker = ConnectionTracker::new();
        let observer = tracker.clone();

        let first = tracker.track();
        let second = tracker.track();
        assert_ne!(first.id(), second.id());
        assert_eq!(observer.active_count(), 2);

        drop(first);
        assert_eq!(observer.active_count(), 1);
        drop(second);
        assert_eq!(observer.active_count(), 0);
    }

    #[test]
    fn ids_start_over_per_tracker() {
        let a = ConnectionTracker::new().track();
        let b = ConnectionTracker::new().track();
        assert_eq!(a.id(), b.id());
        assert_eq!(a.id().to_string(), "conn-1");
    }
}
