//! ConnectionManager: owns the transport session lifecycle and the
//! reconnection state machine.
//!
//! The manager is the single writer of [`ConnectionState`].  It publishes the
//! state through a `watch` channel so callers can query it or await changes,
//! and it is the only component that talks to the [`Transport`] directly.
//!
//! # Lifecycle (for beginners)
//!
//! ```text
//! connect()  ─►  Connecting  ─►  Connected  ─►  (server drops us)
//!                                                    │
//!                     auto_reconnect = false ◄───────┤───────► auto_reconnect = true
//!                            │                                     │
//!                      Disconnected                          Reconnecting
//!                                                       attempt 1, wait, attempt 2, ...
//!                                                     success ─► Connected
//!                                                     exhausted ─► Disconnected
//! ```
//!
//! # Serialisation
//!
//! Every lifecycle transition that talks to the transport (manual connect,
//! disconnect, each reconnection attempt) runs under one async mutex, so they
//! never interleave.  `disconnect()` and a manual `connect()` first abort the
//! reconnection task, then take the mutex: an explicit call always wins over
//! automatic recovery.
//!
//! # Stale signals
//!
//! Transport sessions are numbered.  A `Closed` signal only affects the
//! manager when it names the session the manager currently considers live;
//! anything else is a leftover from an earlier session and is ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use obs_core::{ConnectOptions, ConnectTarget, ConnectionState, SessionConfig};
use serde_json::{json, Map, Value};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::events::{
    EventRegistry, CONNECTION_CLOSED, CONNECTION_ERROR, CONNECTION_OPENED,
};
use crate::application::pending::PendingCalls;
use crate::error::ObsError;
use crate::infrastructure::transport::{
    HandshakeInfo, ServerEvent, Transport, TransportError, TransportSignal,
};

/// What the manager knows about the live session.
#[derive(Default)]
struct SessionSlot {
    /// Handshake of the session the manager considers live.
    current: Option<HandshakeInfo>,
    /// Highest session number the transport has reported closed.
    last_closed: u64,
    /// Where the last successful connect went; reconnection reuses it.
    target: Option<ConnectTarget>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Owner of the connection state and of the transport.
pub struct ConnectionManager {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    state: watch::Sender<ConnectionState>,
    slot: Mutex<SessionSlot>,
    pending: PendingCalls,
    events: Arc<EventRegistry>,
    /// Serialises connect / disconnect / reconnection attempts.
    lifecycle: tokio::sync::Mutex<()>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Creates a manager for `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`ObsError::Configuration`] if `config` fails validation.
    pub fn new(config: SessionConfig, transport: Arc<dyn Transport>) -> Result<Arc<Self>, ObsError> {
        Self::with_events(config, transport, Arc::new(EventRegistry::new()))
    }

    /// Like [`ConnectionManager::new`], dispatching events into `events`.
    ///
    /// # Errors
    ///
    /// Returns [`ObsError::Configuration`] if `config` fails validation.
    pub fn with_events(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        events: Arc<EventRegistry>,
    ) -> Result<Arc<Self>, ObsError> {
        if let Err(e) = config.validate() {
            error!(error = %e, "rejected session configuration");
            return Err(e.into());
        }
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Arc::new(Self {
            config,
            transport,
            state,
            slot: Mutex::new(SessionSlot::default()),
            pending: PendingCalls::new(),
            events,
            lifecycle: tokio::sync::Mutex::new(()),
            reconnect: Mutex::new(None),
            pump: Mutex::new(None),
        }))
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    /// `true` iff the state is exactly `Connected`.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every subsequent state change.
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// The negotiated handshake of the live session, if connected.
    pub fn handshake(&self) -> Option<HandshakeInfo> {
        lock(&self.slot).current.clone()
    }

    /// The registry connection and server events are dispatched into.
    pub fn events(&self) -> &Arc<EventRegistry> {
        &self.events
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Waits until no reconnection loop is running.  Returns immediately when
    /// the state is not `Reconnecting`.
    pub async fn reconnection_settled(&self) {
        let mut changes = self.state.subscribe();
        let _ = changes
            .wait_for(|state| *state != ConnectionState::Reconnecting)
            .await;
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Connects to the server.
    ///
    /// A no-op returning the current handshake when already connected.  A
    /// running reconnection loop is cancelled first.
    ///
    /// # Errors
    ///
    /// - [`ObsError::Configuration`] if no usable endpoint can be resolved.
    /// - [`ObsError::Connection`] if the transport fails to connect, or the
    ///   session closes before the connect completes.
    pub async fn connect(self: &Arc<Self>, options: ConnectOptions) -> Result<HandshakeInfo, ObsError> {
        let target = match self.config.resolve_target(&options) {
            Ok(target) => target,
            Err(e) => {
                error!(error = %e, "cannot connect");
                return Err(e.into());
            }
        };

        self.cancel_reconnection();
        let _lifecycle = self.lifecycle.lock().await;

        if self.is_connected() {
            if let Some(info) = self.handshake() {
                debug!(session = info.session, "already connected");
                return Ok(info);
            }
        }

        self.install_pump();
        self.establish(target, ConnectionState::Connecting).await
    }

    /// Disconnects and cancels any reconnection in progress.  Safe to call
    /// when already disconnected.
    ///
    /// Every pending call is rejected with [`ObsError::ConnectionClosed`]
    /// before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`ObsError::Connection`] if the transport reports a failure
    /// while closing.  The state is `Disconnected` regardless.
    pub async fn disconnect(&self) -> Result<(), ObsError> {
        let cancelled = self.cancel_reconnection();
        let _lifecycle = self.lifecycle.lock().await;

        let (previous, closed_session) = {
            let mut slot = lock(&self.slot);
            let closed = slot.current.take();
            (self.state.send_replace(ConnectionState::Disconnected), closed)
        };
        let rejected = self.pending.reject_all();

        if previous == ConnectionState::Disconnected && !cancelled && closed_session.is_none() {
            debug!("disconnect requested while already disconnected");
            return Ok(());
        }

        info!(%previous, rejected, "disconnecting from OBS");
        let result = self.transport.disconnect().await;

        if let Some(info) = closed_session {
            self.events.dispatch(&ServerEvent::new(
                CONNECTION_CLOSED,
                object(json!({
                    "session": info.session,
                    "code": 1000,
                    "reason": "closed by client",
                    "unsolicited": false
                })),
            ));
        }
        self.settle().await;

        result.map_err(|e| {
            error!(error = %e, "transport failed while disconnecting");
            ObsError::Connection(e)
        })
    }

    // ── Calls ─────────────────────────────────────────────────────────────────

    /// Sends one request on the live session and awaits its reply.
    ///
    /// Fails immediately with [`ObsError::NotConnected`] unless connected;
    /// nothing is sent in that case.
    ///
    /// # Errors
    ///
    /// - [`ObsError::NotConnected`] when not connected.
    /// - [`ObsError::ConnectionClosed`] when the session ends first.
    /// - [`ObsError::RemoteCall`] when the server reports failure.
    pub async fn invoke(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, ObsError> {
        if !self.is_connected() {
            return Err(ObsError::NotConnected);
        }

        let mut ticket = self.pending.register(method);
        tokio::select! {
            biased;
            _ = ticket.rejected() => Err(ObsError::ConnectionClosed {
                method: method.to_string(),
            }),
            reply = self.transport.call(method, params) => {
                reply.map_err(|e| ObsError::from_call(method, e))
            }
        }
    }

    /// Number of calls awaiting a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Connects the transport with the lifecycle lock held.  `phase` is the
    /// state shown while the attempt runs (`Connecting` or `Reconnecting`).
    async fn establish(
        &self,
        target: ConnectTarget,
        phase: ConnectionState,
    ) -> Result<HandshakeInfo, ObsError> {
        self.state.send_replace(phase);
        let mut early_signals = self.transport.signals();
        info!(url = %target.url, "connecting to OBS");

        let failure = match self.transport.connect(&target).await {
            Ok(info) => {
                let closed_early = saw_close(&mut early_signals, info.session);
                let accepted = {
                    let mut slot = lock(&self.slot);
                    if closed_early || slot.last_closed >= info.session {
                        false
                    } else {
                        slot.current = Some(info.clone());
                        slot.target = Some(target.clone());
                        self.state.send_replace(ConnectionState::Connected);
                        true
                    }
                };

                if accepted {
                    info!(
                        session = info.session,
                        version = %info.obs_websocket_version,
                        rpc_version = info.rpc_version,
                        "connected to OBS"
                    );
                    self.events.dispatch(&ServerEvent::new(
                        CONNECTION_OPENED,
                        object(json!({
                            "session": info.session,
                            "obsWebSocketVersion": info.obs_websocket_version,
                            "rpcVersion": info.rpc_version
                        })),
                    ));
                    self.settle().await;
                    return Ok(info);
                }
                TransportError::Closed
            }
            Err(e) => e,
        };

        // A failed reconnection attempt is logged by the reconnect loop.
        if phase == ConnectionState::Connecting {
            self.state.send_replace(ConnectionState::Disconnected);
            error!(url = %target.url, error = %failure, "connection to OBS failed");
        }
        Err(ObsError::Connection(failure))
    }

    async fn settle(&self) {
        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
    }

    /// Starts the signal pump once per manager.
    fn install_pump(self: &Arc<Self>) {
        let mut pump = lock(&self.pump);
        if pump.is_none() {
            let signals = self.transport.signals();
            *pump = Some(tokio::spawn(signal_pump(Arc::downgrade(self), signals)));
        }
    }

    /// Aborts the reconnection task.  Returns `true` if one was running.
    fn cancel_reconnection(&self) -> bool {
        match lock(&self.reconnect).take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                info!("reconnection cancelled");
                true
            }
            _ => false,
        }
    }

    fn on_signal(self: &Arc<Self>, signal: TransportSignal) {
        match signal {
            TransportSignal::Opened { session } => debug!(session, "transport session opened"),
            TransportSignal::Closed {
                session,
                code,
                reason,
            } => self.on_closed(session, code, reason),
            TransportSignal::Error { session, message } => {
                warn!(session, %message, "transport reported an error");
                self.events.dispatch(&ServerEvent::new(
                    CONNECTION_ERROR,
                    object(json!({"session": session, "message": message})),
                ));
            }
            TransportSignal::Event(event) => {
                self.events.dispatch(&event);
            }
        }
    }

    fn on_closed(self: &Arc<Self>, session: u64, code: Option<u16>, reason: String) {
        let auto = self.config.auto_reconnect;
        let unsolicited = {
            let mut slot = lock(&self.slot);
            slot.last_closed = slot.last_closed.max(session);
            if slot.current.as_ref().map(|info| info.session) != Some(session) {
                debug!(session, "ignoring close of a session that is no longer current");
                return;
            }
            slot.current = None;
            self.state.send_if_modified(|state| {
                if *state == ConnectionState::Connected {
                    *state = if auto {
                        ConnectionState::Reconnecting
                    } else {
                        ConnectionState::Disconnected
                    };
                    true
                } else {
                    false
                }
            })
        };

        self.events.dispatch(&ServerEvent::new(
            CONNECTION_CLOSED,
            object(json!({
                "session": session,
                "code": code,
                "reason": reason,
                "unsolicited": unsolicited
            })),
        ));
        if !unsolicited {
            return;
        }

        let rejected = self.pending.reject_all();
        warn!(session, ?code, %reason, rejected, auto_reconnect = auto, "connection to OBS lost");
        if auto {
            self.spawn_reconnect();
        }
    }

    fn spawn_reconnect(self: &Arc<Self>) {
        let task = tokio::spawn(reconnect_loop(
            Arc::downgrade(self),
            self.config.retry_attempts,
            self.config.retry_delay,
        ));
        // The state only enters Reconnecting from Connected, so an older
        // loop can only be in its final moments after a success.
        if let Some(previous) = lock(&self.reconnect).replace(task) {
            previous.abort();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.reconnect).take() {
            task.abort();
        }
        if let Some(task) = lock(&self.pump).take() {
            task.abort();
        }
    }
}

/// Drains already-buffered signals looking for a close of `session`.
fn saw_close(signals: &mut broadcast::Receiver<TransportSignal>, session: u64) -> bool {
    loop {
        match signals.try_recv() {
            Ok(TransportSignal::Closed { session: s, .. }) if s == session => return true,
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return false,
        }
    }
}

/// Forwards transport signals to the manager until either side goes away.
async fn signal_pump(manager: Weak<ConnectionManager>, mut signals: broadcast::Receiver<TransportSignal>) {
    loop {
        let signal = match signals.recv().await {
            Ok(signal) => signal,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "signal pump fell behind; some events were dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let Some(manager) = manager.upgrade() else {
            break;
        };
        manager.on_signal(signal);
    }
}

/// Up to `attempts` connects; the first runs immediately, the rest after
/// `delay`.  Ends early if anything else moves the state out of
/// `Reconnecting`.
async fn reconnect_loop(weak: Weak<ConnectionManager>, attempts: u32, delay: Duration) {
    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(delay).await;
        }
        let Some(manager) = weak.upgrade() else {
            return;
        };

        let outcome = {
            let _lifecycle = manager.lifecycle.lock().await;
            if manager.state() != ConnectionState::Reconnecting {
                debug!("reconnection superseded");
                return;
            }
            let target = lock(&manager.slot).target.clone();
            let target = match target {
                Some(target) => target,
                None => match manager.config.resolve_target(&ConnectOptions::none()) {
                    Ok(target) => target,
                    Err(e) => {
                        error!(error = %e, "cannot reconnect");
                        break;
                    }
                },
            };
            info!(attempt, attempts, "reconnecting to OBS");
            manager.establish(target, ConnectionState::Reconnecting).await
        };

        match outcome {
            Ok(info) => {
                info!(attempt, session = info.session, "reconnected to OBS");
                return;
            }
            Err(e) => warn!(attempt, attempts, error = %e, "reconnection attempt failed"),
        }
    }

    if let Some(manager) = weak.upgrade() {
        let gave_up = manager.state.send_if_modified(|state| {
            if *state == ConnectionState::Reconnecting {
                *state = ConnectionState::Disconnected;
                true
            } else {
                false
            }
        });
        if gave_up {
            warn!(attempts, "giving up on reconnection; staying disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::fake::FakeTransport;
    use crate::infrastructure::transport::MockTransport;

    fn manager_with_fake(config: SessionConfig) -> (Arc<ConnectionManager>, Arc<FakeTransport>) {
        let fake = Arc::new(FakeTransport::new());
        let transport: Arc<dyn Transport> = fake.clone();
        (ConnectionManager::new(config, transport).unwrap(), fake)
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SessionConfig {
            retry_attempts: 0,
            ..SessionConfig::default()
        };
        let mut mock = MockTransport::new();
        mock.expect_connect().never();

        let result = ConnectionManager::new(config, Arc::new(mock));

        assert!(matches!(result, Err(ObsError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_connect_failure_returns_to_disconnected() {
        // Arrange
        let (manager, fake) = manager_with_fake(SessionConfig::default());
        fake.fail_next_connects(1);

        // Act
        let result = manager.connect(ConnectOptions::none()).await;

        // Assert
        assert!(matches!(result, Err(ObsError::Connection(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_connect_twice_reuses_the_live_session() {
        let (manager, fake) = manager_with_fake(SessionConfig::default());

        let first = manager.connect(ConnectOptions::none()).await.unwrap();
        let second = manager.connect(ConnectOptions::none()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(fake.connect_attempts(), 1);
    }

    #[tokio::test]
    async fn test_close_during_connect_fails_the_connect() {
        // Arrange
        let (manager, fake) = manager_with_fake(SessionConfig::default());
        fake.close_during_next_connect();

        // Act
        let result = manager.connect(ConnectOptions::none()).await;

        // Assert
        assert_eq!(result, Err(ObsError::Connection(TransportError::Closed)));
        assert!(!manager.is_connected());
        assert!(manager.handshake().is_none());
    }

    #[tokio::test]
    async fn test_invoke_while_disconnected_never_reaches_transport() {
        let mut mock = MockTransport::new();
        mock.expect_call().never();
        let manager = ConnectionManager::new(SessionConfig::default(), Arc::new(mock)).unwrap();

        let result = manager.invoke("GetVersion", Map::new()).await;

        assert_eq!(result, Err(ObsError::NotConnected));
    }

    #[tokio::test]
    async fn test_connect_passes_resolved_target_to_transport() {
        // Arrange
        let config = SessionConfig {
            url: Some("ws://studio.local:4455".to_string()),
            password: Some("from-config".to_string()),
            ..SessionConfig::default()
        };
        let (tx, _) = broadcast::channel(8);
        let mut mock = MockTransport::new();
        mock.expect_signals().returning(move || tx.subscribe());
        mock.expect_connect()
            .withf(|target| {
                target.url == "ws://studio.local:4455"
                    && target.password.as_deref() == Some("override")
            })
            .times(1)
            .returning(|_| {
                Ok(HandshakeInfo {
                    obs_websocket_version: "5.4.2".to_string(),
                    rpc_version: 1,
                    session: 1,
                })
            });
        let manager = ConnectionManager::new(config, Arc::new(mock)).unwrap();

        // Act
        let info = manager
            .connect(ConnectOptions::none().with_password("override"))
            .await
            .unwrap();

        // Assert
        assert_eq!(info.session, 1);
        assert!(manager.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_failure_still_leaves_disconnected() {
        let (tx, _) = broadcast::channel(8);
        let mut mock = MockTransport::new();
        mock.expect_signals().returning(move || tx.subscribe());
        mock.expect_connect().returning(|_| {
            Ok(HandshakeInfo {
                obs_websocket_version: "5.4.2".to_string(),
                rpc_version: 1,
                session: 1,
            })
        });
        mock.expect_disconnect()
            .times(1)
            .returning(|| Err(TransportError::WebSocket("broken pipe".to_string())));
        let manager = ConnectionManager::new(SessionConfig::default(), Arc::new(mock)).unwrap();
        manager.connect(ConnectOptions::none()).await.unwrap();

        let result = manager.disconnect().await;

        assert!(matches!(result, Err(ObsError::Connection(_))));
        assert_eq!(manager.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_stale_close_is_ignored() {
        // Arrange: connect twice so session 1 is stale
        let (manager, fake) = manager_with_fake(SessionConfig::default());
        manager.connect(ConnectOptions::none()).await.unwrap();
        manager.disconnect().await.unwrap();
        let info = manager.connect(ConnectOptions::none()).await.unwrap();
        assert_eq!(info.session, 2);

        // Act
        manager.on_closed(1, Some(1006), "late".to_string());

        // Assert
        assert!(manager.is_connected());
        assert!(fake.is_open());
    }
}
