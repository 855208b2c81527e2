//! # Connectivity Monitor
//!
//! Tri-state connection status with observer fan-out.
//!
//! ## Status Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Connection Status                                  │
//! │                                                                         │
//! │  ┌────────────┐   live fetch OK    ┌────────────┐                      │
//! │  │   Online   │ ◄───────────────── │Reconnecting│                      │
//! │  └─────┬──────┘                    └─────▲──────┘                      │
//! │        │                                 │                              │
//! │        │  fetch attempt starts /         │  retries exhausted,          │
//! │        │  push channel drops             │  serving cached content      │
//! │        └────────────────────────────────►│                              │
//! │                                    ┌─────┴──────┐                      │
//! │                                    │  Offline   │                      │
//! │                                    └────────────┘                      │
//! │                                                                         │
//! │  WHO DRIVES IT: only the ContentFetcher path and the PushManager.      │
//! │  Nothing polls the network just to update this status.                 │
//! │                                                                         │
//! │  WHO READS IT: the player shell, to decide whether to show the         │
//! │  "offline" indicator next to the rendered content.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Observer Contract
//! `set_status` with an unchanged value is a no-op: observers only ever see
//! *changes*, never redundant repeats. Notification is synchronous and
//! side-effect-light; registry mutation never spans an await (a std Mutex,
//! not an async one, enforces that shape).

use std::sync::{Arc, Mutex, Weak};
use tracing::debug;

// =============================================================================
// Connection Status
// =============================================================================

/// Connection status of the player as a whole.
///
/// Held in process memory only; resets to `Online` at process start and is
/// corrected by the first fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Live fetches are succeeding.
    Online,

    /// Serving cached content; the network is unavailable.
    Offline,

    /// A fetch or channel reconnect is in flight.
    Reconnecting,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Online => write!(f, "online"),
            ConnectionStatus::Offline => write!(f, "offline"),
            ConnectionStatus::Reconnecting => write!(f, "reconnecting"),
        }
    }
}

// =============================================================================
// Connectivity Monitor
// =============================================================================

type Observer = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

struct MonitorInner {
    status: ConnectionStatus,
    observers: Vec<(u64, Observer)>,
    next_id: u64,
}

/// Single source of truth for the player's connection status.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct ConnectivityMonitor {
    inner: Arc<Mutex<MonitorInner>>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    /// Creates a monitor with the initial `Online` status.
    pub fn new() -> Self {
        ConnectivityMonitor {
            inner: Arc::new(Mutex::new(MonitorInner {
                status: ConnectionStatus::Online,
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> ConnectionStatus {
        self.inner.lock().expect("monitor lock poisoned").status
    }

    /// Transitions to a new status, notifying observers.
    ///
    /// A no-op (no notification) when `new_status` equals the current status.
    /// Returns true if a transition happened.
    pub fn set_status(&self, new_status: ConnectionStatus) -> bool {
        let observers: Vec<Observer> = {
            let mut inner = self.inner.lock().expect("monitor lock poisoned");
            if inner.status == new_status {
                return false;
            }

            debug!(from = %inner.status, to = %new_status, "Connection status changed");
            inner.status = new_status;
            inner.observers.iter().map(|(_, cb)| cb.clone()).collect()
        };

        // Invoke outside the lock so an observer may read the monitor
        for cb in observers {
            cb(new_status);
        }

        true
    }

    /// Registers an observer callback.
    ///
    /// Returns a subscription guard; dropping it (or calling
    /// [`StatusSubscription::unsubscribe`]) deregisters the callback.
    pub fn subscribe(
        &self,
        callback: impl Fn(ConnectionStatus) + Send + Sync + 'static,
    ) -> StatusSubscription {
        let mut inner = self.inner.lock().expect("monitor lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.observers.push((id, Arc::new(callback)));

        StatusSubscription {
            id,
            monitor: Arc::downgrade(&self.inner),
        }
    }

    /// Number of registered observers (diagnostics).
    pub fn observer_count(&self) -> usize {
        self.inner.lock().expect("monitor lock poisoned").observers.len()
    }
}

// =============================================================================
// Status Subscription
// =============================================================================

/// Guard for a registered status observer. Unsubscribes on drop.
pub struct StatusSubscription {
    id: u64,
    monitor: Weak<Mutex<MonitorInner>>,
}

impl StatusSubscription {
    /// Explicitly deregisters the observer.
    pub fn unsubscribe(self) {
        // Drop does the work
    }

    fn remove(&self) {
        if let Some(inner) = self.monitor.upgrade() {
            let mut inner = inner.lock().expect("monitor lock poisoned");
            inner.observers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Drop for StatusSubscription {
    fn drop(&mut self) {
        self.remove();
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_initial_status_is_online() {
        let monitor = ConnectivityMonitor::new();
        assert_eq!(monitor.status(), ConnectionStatus::Online);
    }

    #[test]
    fn test_set_status_transitions() {
        let monitor = ConnectivityMonitor::new();
        assert!(monitor.set_status(ConnectionStatus::Offline));
        assert_eq!(monitor.status(), ConnectionStatus::Offline);
    }

    #[test]
    fn test_redundant_set_status_notifies_once() {
        let monitor = ConnectivityMonitor::new();
        let notifications = Arc::new(AtomicUsize::new(0));

        let counter = notifications.clone();
        let _sub = monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(monitor.set_status(ConnectionStatus::Offline));
        assert!(!monitor.set_status(ConnectionStatus::Offline));
        assert!(!monitor.set_status(ConnectionStatus::Offline));

        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_observer_sees_new_status() {
        let monitor = ConnectivityMonitor::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let _sub = monitor.subscribe(move |status| {
            sink.lock().unwrap().push(status);
        });

        monitor.set_status(ConnectionStatus::Reconnecting);
        monitor.set_status(ConnectionStatus::Online);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![ConnectionStatus::Reconnecting, ConnectionStatus::Online]
        );
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let monitor = ConnectivityMonitor::new();
        let notifications = Arc::new(AtomicUsize::new(0));

        let counter = notifications.clone();
        let sub = monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        monitor.set_status(ConnectionStatus::Offline);
        sub.unsubscribe();
        monitor.set_status(ConnectionStatus::Online);

        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.observer_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let monitor = ConnectivityMonitor::new();
        {
            let _sub = monitor.subscribe(|_| {});
            assert_eq!(monitor.observer_count(), 1);
        }
        assert_eq!(monitor.observer_count(), 0);
    }

    #[test]
    fn test_observer_may_read_monitor_reentrantly() {
        let monitor = ConnectivityMonitor::new();
        let observed = Arc::new(Mutex::new(None));

        let m = monitor.clone();
        let sink = observed.clone();
        let _sub = monitor.subscribe(move |_| {
            // Reading back inside the callback must not deadlock
            *sink.lock().unwrap() = Some(m.status());
        });

        monitor.set_status(ConnectionStatus::Offline);
        assert_eq!(*observed.lock().unwrap(), Some(ConnectionStatus::Offline));
    }
}
