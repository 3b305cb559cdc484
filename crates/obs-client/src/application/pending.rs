//! Registry of in-flight calls.
//!
//! Every call made through the connection manager holds a [`PendingTicket`]
//! for as long as it awaits its reply.  When the connection ends,
//! [`PendingCalls::reject_all`] fires each ticket's rejection channel exactly
//! once and empties the registry.  A ticket removes itself when dropped, so a
//! call that completes normally leaves nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

struct Entry {
    method: String,
    reject: oneshot::Sender<()>,
}

#[derive(Default)]
struct Inner {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, Entry>>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<u64, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Calls currently awaiting a reply.
#[derive(Clone, Default)]
pub struct PendingCalls {
    inner: Arc<Inner>,
}

/// A registered call.  Await [`PendingTicket::rejected`] alongside the reply.
pub struct PendingTicket {
    id: u64,
    inner: Arc<Inner>,
    rejected: Option<oneshot::Receiver<()>>,
}

impl PendingCalls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a call to `method`.
    pub fn register(&self, method: &str) -> PendingTicket {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (reject, rejected) = oneshot::channel();
        self.inner.entries().insert(
            id,
            Entry {
                method: method.to_string(),
                reject,
            },
        );
        PendingTicket {
            id,
            inner: Arc::clone(&self.inner),
            rejected: Some(rejected),
        }
    }

    /// Rejects every registered call and empties the registry.  Returns the
    /// number of calls rejected.
    pub fn reject_all(&self) -> usize {
        let drained: Vec<Entry> = self.inner.entries().drain().map(|(_, e)| e).collect();
        let count = drained.len();
        for entry in drained {
            tracing::debug!(method = %entry.method, "rejecting pending call");
            let _ = entry.reject.send(());
        }
        count
    }

    /// Number of calls currently registered.
    pub fn len(&self) -> usize {
        self.inner.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PendingTicket {
    /// Resolves once the call is rejected.  Never resolves for a call that
    /// completes first.
    pub async fn rejected(&mut self) {
        match self.rejected.as_mut() {
            Some(rx) => {
                if rx.await.is_ok() {
                    self.rejected = None;
                    return;
                }
                // Sender dropped without rejecting: the entry was removed
                // some other way, so rejection can no longer happen.
                self.rejected = None;
                std::future::pending::<()>().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

impl Drop for PendingTicket {
    fn drop(&mut self) {
        self.inner.entries().remove(&self.id);
    }
}
