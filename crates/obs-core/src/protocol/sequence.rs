//! Thread-safe generator for request correlation ids.
//!
//! # What is a request id? (for beginners)
//!
//! obs-websocket lets a client have many requests in flight at once.  Each
//! `Request` carries a `requestId` string, and the server echoes the same
//! string back in the matching `RequestResponse`.  The client uses it to hand
//! each reply to the caller that is waiting for it.
//!
//! The ids only need to be unique among requests that are in flight at the
//! same time on one connection.  This generator makes them unique for the
//! whole process lifetime by combining a random per-generator prefix with an
//! atomic counter: `"<uuid>-0"`, `"<uuid>-1"`, ...
//!
//! # Thread safety
//!
//! The counter is an `AtomicU64`, so many tasks can call [`RequestIdSequence::next_id`]
//! at once without a lock and without two of them receiving the same id.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// A thread-safe, monotonically increasing source of request ids.
///
/// # Examples
///
/// ```rust
/// use obs_core::protocol::RequestIdSequence;
///
/// let ids = RequestIdSequence::new();
/// let a = ids.next_id();
/// let b = ids.next_id();
/// assert_ne!(a, b);
/// assert!(a.ends_with("-0"));
/// ```
#[derive(Debug)]
pub struct RequestIdSequence {
    prefix: String,
    counter: AtomicU64,
}

impl RequestIdSequence {
    /// Creates a sequence with a fresh random prefix, starting at 0.
    pub fn new() -> Self {
        Self::with_prefix(Uuid::new_v4().simple().to_string())
    }

    /// Creates a sequence with a caller-chosen prefix.  Useful in tests where
    /// ids must be predictable.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Returns the next id and advances the counter.
    ///
    /// Wraps from `u64::MAX` to 0 without panicking.  `Relaxed` ordering is
    /// enough because ids carry no memory-synchronisation meaning.
    pub fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }

    /// Number of ids handed out so far (modulo wrap-around).
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl Default for RequestIdSequence {
    fn default() -> Self {
        Self::new()
    }
}
