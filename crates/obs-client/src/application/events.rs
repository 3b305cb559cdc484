//! Event subscription registry.
//!
//! Handlers are registered per event type with [`EventRegistry::on`] and
//! invoked in registration order by [`EventRegistry::dispatch`].  A handler
//! that returns an error or panics is logged and skipped; the remaining
//! handlers still run and the dispatching task is unaffected.
//!
//! The registry also receives synthetic connection events from the
//! connection manager ([`CONNECTION_OPENED`], [`CONNECTION_CLOSED`],
//! [`CONNECTION_ERROR`]) and supports a [`ANY_EVENT`] wildcard.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::infrastructure::transport::ServerEvent;

/// Subscribing to this type receives every event.
pub const ANY_EVENT: &str = "*";
/// Dispatched after a connection (or reconnection) completes.
pub const CONNECTION_OPENED: &str = "ConnectionOpened";
/// Dispatched when the current connection ends, for any reason.
pub const CONNECTION_CLOSED: &str = "ConnectionClosed";
/// Dispatched when the transport reports a non-fatal error.
pub const CONNECTION_ERROR: &str = "ConnectionError";

/// Handle returned by [`EventRegistry::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync>;

struct Subscription {
    id: SubscriptionId,
    event_type: String,
    handler: Handler,
}

/// Event-type → handlers table.
#[derive(Default)]
pub struct EventRegistry {
    next_id: AtomicU64,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn subscriptions(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `handler` for `event_type`.
    pub fn on<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscriptions().push(Subscription {
            id,
            event_type: event_type.to_string(),
            handler: Arc::new(handler),
        });
        id
    }

    /// Removes a subscription.  Returns `false` if it was already removed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscriptions = self.subscriptions();
        let before = subscriptions.len();
        subscriptions.retain(|s| s.id != id);
        subscriptions.len() != before
    }

    /// Number of handlers registered for exactly `event_type`.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.subscriptions()
            .iter()
            .filter(|s| s.event_type == event_type)
            .count()
    }

    /// Invokes every handler registered for the event's type (and the
    /// wildcard), in registration order.  Returns how many handlers ran
    /// successfully.
    pub fn dispatch(&self, event: &ServerEvent) -> usize {
        // Snapshot so handlers may subscribe or unsubscribe while running.
        let handlers: Vec<Handler> = self
            .subscriptions()
            .iter()
            .filter(|s| s.event_type == event.event_type || s.event_type == ANY_EVENT)
            .map(|s| Arc::clone(&s.handler))
            .collect();

        let mut succeeded = 0;
        for handler in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => succeeded += 1,
                Ok(Err(e)) => {
                    warn!(event = %event.event_type, error = %e, "event handler failed");
                }
                Err(_) => {
                    warn!(event = %event.event_type, "event handler panicked");
                }
            }
        }
        succeeded
    }
}
