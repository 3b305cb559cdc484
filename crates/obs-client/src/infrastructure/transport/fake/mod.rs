//! A scriptable in-memory transport.
//!
//! [`FakeTransport`] stands in for a live OBS instance in tests and in the
//! CLI's own test suite.  Requests are answered by a [`SimulatedObs`] model
//! unless a custom responder is installed, and the test can:
//!
//! - fail the next N connection attempts (or all of them),
//! - delay or hang individual request types,
//! - drop the session from the "server" side with [`FakeTransport::close_unsolicited`],
//! - push server events with [`FakeTransport::emit_event`].
//!
//! Every session emits exactly one `Opened` and one `Closed` signal, the same
//! guarantee the WebSocket transport gives.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use obs_core::ConnectTarget;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};

use super::{
    HandshakeInfo, ServerEvent, Transport, TransportError, TransportSignal, SIGNAL_CHANNEL_CAPACITY,
};

mod server;

pub use server::{SimInput, SimItem, SimScene, SimulatedObs, INPUT_KINDS, OUTPUT_NAMES};

/// Custom request handler that replaces the simulated server.
pub type Responder =
    Arc<dyn Fn(&str, &Map<String, Value>) -> Result<Map<String, Value>, TransportError> + Send + Sync>;

/// One request as the fake received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: Map<String, Value>,
}

struct Script {
    next_session: u64,
    connect_attempts: u32,
    failures_remaining: u32,
    fail_always: bool,
    connect_error: TransportError,
    connect_delay: Option<Duration>,
    close_during_connect: bool,
    required_password: Option<String>,
    last_target: Option<ConnectTarget>,
    calls: Vec<RecordedCall>,
    delays: HashMap<String, Duration>,
    hanging: HashSet<String>,
    responder: Option<Responder>,
}

/// In-memory [`Transport`] backed by a [`SimulatedObs`].
pub struct FakeTransport {
    script: Mutex<Script>,
    server: Mutex<SimulatedObs>,
    /// The session currently open, if any.
    live: watch::Sender<Option<u64>>,
    signals: broadcast::Sender<TransportSignal>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTransport {
    /// A fake whose server has a single scene named `"Scene"`.
    pub fn new() -> Self {
        Self::with_server(SimulatedObs::default())
    }

    /// A fake answering requests from `server`.
    pub fn with_server(server: SimulatedObs) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        let (live, _) = watch::channel(None);
        Self {
            script: Mutex::new(Script {
                next_session: 0,
                connect_attempts: 0,
                failures_remaining: 0,
                fail_always: false,
                connect_error: TransportError::WebSocket("connection refused".to_string()),
                connect_delay: None,
                close_during_connect: false,
                required_password: None,
                last_target: None,
                calls: Vec::new(),
                delays: HashMap::new(),
                hanging: HashSet::new(),
                responder: None,
            }),
            server: Mutex::new(server),
            live,
            signals,
        }
    }

    // ── Scripting ─────────────────────────────────────────────────────────────

    /// Makes the next `count` connection attempts fail.
    pub fn fail_next_connects(&self, count: u32) {
        lock(&self.script).failures_remaining = count;
    }

    /// Makes every connection attempt fail (or succeed again).
    pub fn fail_all_connects(&self, fail: bool) {
        lock(&self.script).fail_always = fail;
    }

    /// Sets the error returned by failing connection attempts.
    pub fn set_connect_error(&self, error: TransportError) {
        lock(&self.script).connect_error = error;
    }

    /// Makes every connection attempt take `delay` before completing.
    pub fn set_connect_delay(&self, delay: Duration) {
        lock(&self.script).connect_delay = Some(delay);
    }

    /// The next successful handshake is followed immediately by a server close.
    pub fn close_during_next_connect(&self) {
        lock(&self.script).close_during_connect = true;
    }

    /// Rejects handshakes whose password differs from `password`, the way a
    /// server closes with code 4009.
    pub fn require_password(&self, password: impl Into<String>) {
        lock(&self.script).required_password = Some(password.into());
    }

    /// Delays replies to `method` by `delay`.
    pub fn delay_method(&self, method: impl Into<String>, delay: Duration) {
        lock(&self.script).delays.insert(method.into(), delay);
    }

    /// Never replies to `method`; the call only ends when the session closes.
    pub fn hang_method(&self, method: impl Into<String>) {
        lock(&self.script).hanging.insert(method.into());
    }

    /// Answers every request with `responder` instead of the simulated server.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&str, &Map<String, Value>) -> Result<Map<String, Value>, TransportError>
            + Send
            + Sync
            + 'static,
    {
        lock(&self.script).responder = Some(Arc::new(responder));
    }

    // ── Server-side actions ───────────────────────────────────────────────────

    /// Drops the current session as if the server went away.  Returns `false`
    /// when nothing was open.
    pub fn close_unsolicited(&self, code: Option<u16>, reason: &str) -> bool {
        self.end_session(code, reason)
    }

    /// Pushes a server event to every signal subscriber.
    pub fn emit_event(&self, event_type: &str, data: Map<String, Value>) {
        let _ = self
            .signals
            .send(TransportSignal::Event(ServerEvent::new(event_type, data)));
    }

    /// Reports a non-fatal session error.
    pub fn emit_error(&self, message: &str) {
        if let Some(session) = *self.live.borrow() {
            let _ = self.signals.send(TransportSignal::Error {
                session,
                message: message.to_string(),
            });
        }
    }

    // ── Inspection ────────────────────────────────────────────────────────────

    /// Number of connection attempts made so far, failed ones included.
    pub fn connect_attempts(&self) -> u32 {
        lock(&self.script).connect_attempts
    }

    /// Every request received, in arrival order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock(&self.script).calls.clone()
    }

    /// Number of requests received for `method`.
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.script)
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// The target of the most recent connection attempt.
    pub fn last_target(&self) -> Option<ConnectTarget> {
        lock(&self.script).last_target.clone()
    }

    /// Whether a session is currently open.
    pub fn is_open(&self) -> bool {
        self.live.borrow().is_some()
    }

    /// Runs `f` against the simulated server, for setup or assertions.
    pub fn inspect_server<R>(&self, f: impl FnOnce(&mut SimulatedObs) -> R) -> R {
        f(&mut lock(&self.server))
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn end_session(&self, code: Option<u16>, reason: &str) -> bool {
        match self.live.send_replace(None) {
            Some(session) => {
                let _ = self.signals.send(TransportSignal::Closed {
                    session,
                    code,
                    reason: reason.to_string(),
                });
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(&self, target: &ConnectTarget) -> Result<HandshakeInfo, TransportError> {
        let delay = {
            let mut script = lock(&self.script);
            script.connect_attempts += 1;
            script.last_target = Some(target.clone());
            script.connect_delay
        };
        match delay {
            Some(delay) => tokio::time::sleep(delay).await,
            None => tokio::task::yield_now().await,
        }

        self.end_session(Some(1000), "replaced by a new session");

        let (session, close_now) = {
            let mut script = lock(&self.script);
            if script.fail_always || script.failures_remaining > 0 {
                script.failures_remaining = script.failures_remaining.saturating_sub(1);
                return Err(script.connect_error.clone());
            }
            if let Some(required) = &script.required_password {
                if target.password.as_deref() != Some(required.as_str()) {
                    return Err(match target.password {
                        None => TransportError::AuthenticationRequired,
                        Some(_) => TransportError::HandshakeRejected {
                            code: 4009,
                            reason: "Authentication failed.".to_string(),
                        },
                    });
                }
            }
            script.next_session += 1;
            (
                script.next_session,
                std::mem::take(&mut script.close_during_connect),
            )
        };

        self.live.send_replace(Some(session));
        let _ = self.signals.send(TransportSignal::Opened { session });
        if close_now {
            self.end_session(Some(1006), "connection dropped");
        }

        Ok(HandshakeInfo {
            obs_websocket_version: "5.4.2".to_string(),
            rpc_version: obs_core::protocol::RPC_VERSION,
            session,
        })
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.end_session(Some(1000), "closed by client");
        tokio::task::yield_now().await;
        Ok(())
    }

    async fn call(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, TransportError> {
        let session = (*self.live.borrow()).ok_or(TransportError::NotOpen)?;

        let (delay, hang, responder) = {
            let mut script = lock(&self.script);
            script.calls.push(RecordedCall {
                method: method.to_string(),
                params: params.clone(),
            });
            (
                script.delays.get(method).copied(),
                script.hanging.contains(method),
                script.responder.clone(),
            )
        };

        let mut live = self.live.subscribe();
        let ended = async move {
            let _ = live.wait_for(|current| *current != Some(session)).await;
        };
        let reply_time = async move {
            if hang {
                std::future::pending::<()>().await;
            } else if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            } else {
                tokio::task::yield_now().await;
            }
        };

        tokio::select! {
            _ = ended => return Err(TransportError::Closed),
            _ = reply_time => {}
        }
        if *self.live.borrow() != Some(session) {
            return Err(TransportError::Closed);
        }

        match responder {
            Some(responder) => responder(method, &params),
            None => lock(&self.server).handle(method, &params),
        }
    }

    fn signals(&self) -> broadcast::Receiver<TransportSignal> {
        self.signals.subscribe()
    }
}
