//! Production transport over tokio-tungstenite.
//!
//! # Session anatomy
//!
//! ```text
//!   connect()                      ┌──────────── read_loop task ───────────┐
//!     │ connect_async              │ Text → RequestResponse → reply table  │
//!     │ Hello → Identify           │ Text → Event → TransportSignal::Event │
//!     │ ← Identified               │ stream end → finish() → Closed signal │
//!     ▼                            └───────────────────────────────────────┘
//!   split ──▶ write_loop task  ◀── mpsc queue ◀── call() / disconnect()
//! ```
//!
//! Each request gets a fresh id from a [`RequestIdSequence`] and a oneshot
//! slot in the session's reply table.  The read loop completes the slot when
//! the matching `RequestResponse` arrives.  When the session ends every slot
//! still waiting is dropped, so its caller observes [`TransportError::Closed`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use obs_core::auth::authentication_string;
use obs_core::protocol::messages::{
    close_code, Identify, ObsMessage, Request, RequestResponse, RPC_VERSION,
};
use obs_core::protocol::{decode_message, encode_message, RequestIdSequence};
use obs_core::{ConnectTarget, ProtocolError, SessionConfig};
use serde_json::{Map, Value};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::{
    HandshakeInfo, ServerEvent, Transport, TransportError, TransportSignal,
    SIGNAL_CHANNEL_CAPACITY,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code sent when the client ends the session itself.
const NORMAL_CLOSURE: u16 = 1000;

/// Timing and subscription settings for each session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub handshake_timeout: Duration,
    pub close_timeout: Duration,
    pub event_subscriptions: u32,
}

impl From<&SessionConfig> for LinkSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            handshake_timeout: config.handshake_timeout,
            close_timeout: config.close_timeout,
            event_subscriptions: config.event_subscriptions,
        }
    }
}

/// obs-websocket v5 client transport.
pub struct WebSocketTransport {
    settings: LinkSettings,
    ids: RequestIdSequence,
    sessions: AtomicU64,
    signals: broadcast::Sender<TransportSignal>,
    link: Mutex<Option<Link>>,
}

/// The live half of a session, owned by the transport.
struct Link {
    shared: Arc<SessionShared>,
    outbound: mpsc::UnboundedSender<WsMessage>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Session state shared between the transport and the read loop.
struct SessionShared {
    session: u64,
    replies: Mutex<ReplyTable>,
    finished: AtomicBool,
    signals: broadcast::Sender<TransportSignal>,
}

struct ReplyTable {
    open: bool,
    waiting: HashMap<String, oneshot::Sender<RequestResponse>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WebSocketTransport {
    /// Creates a transport with no open session.
    pub fn new(settings: LinkSettings) -> Self {
        let (signals, _) = broadcast::channel(SIGNAL_CHANNEL_CAPACITY);
        Self {
            settings,
            ids: RequestIdSequence::new(),
            sessions: AtomicU64::new(0),
            signals,
            link: Mutex::new(None),
        }
    }

    /// Creates a transport using the timing settings of `config`.
    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(LinkSettings::from(config))
    }

    /// Drops a session left over from an earlier `connect()` without waiting
    /// for the server.
    fn teardown_stale(&self) {
        let stale = lock(&self.link).take();
        if let Some(link) = stale {
            debug!(session = link.shared.session, "tearing down stale session");
            link.reader.abort();
            link.writer.abort();
            link.shared
                .finish(None, "replaced by a new session".to_string());
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        if let Some(link) = lock(&self.link).take() {
            link.reader.abort();
            link.writer.abort();
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, target: &ConnectTarget) -> Result<HandshakeInfo, TransportError> {
        self.teardown_stale();

        let limit = self.settings.handshake_timeout;
        let (mut ws, _response) = timeout(limit, connect_async(target.url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(limit))?
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        let outcome = timeout(
            limit,
            handshake(&mut ws, target, self.settings.event_subscriptions),
        )
        .await;
        let negotiated = match outcome {
            Ok(result) => result?,
            Err(_) => {
                let _ = ws.send(WsMessage::Close(None)).await;
                return Err(TransportError::Timeout(limit));
            }
        };

        let session = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let shared = Arc::new(SessionShared {
            session,
            replies: Mutex::new(ReplyTable {
                open: true,
                waiting: HashMap::new(),
            }),
            finished: AtomicBool::new(false),
            signals: self.signals.clone(),
        });

        let _ = self.signals.send(TransportSignal::Opened { session });

        let (sink, source) = ws.split();
        let (outbound, queue) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(sink, queue, session));
        let reader = tokio::spawn(read_loop(source, Arc::clone(&shared)));

        *lock(&self.link) = Some(Link {
            shared,
            outbound,
            reader,
            writer,
        });

        info!(
            session,
            url = %target.url,
            version = %negotiated.obs_websocket_version,
            rpc = negotiated.rpc_version,
            "obs-websocket session opened"
        );

        Ok(HandshakeInfo {
            obs_websocket_version: negotiated.obs_websocket_version,
            rpc_version: negotiated.rpc_version,
            session,
        })
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let link = lock(&self.link).take();
        let Some(Link {
            shared,
            outbound,
            mut reader,
            writer,
        }) = link
        else {
            return Ok(());
        };

        // The writer sends the close frame and exits; the reader keeps going
        // until the server echoes the close and the stream ends.
        let _ = outbound.send(WsMessage::Close(None));
        drop(outbound);

        if timeout(self.settings.close_timeout, &mut reader).await.is_err() {
            warn!(
                session = shared.session,
                "server did not acknowledge the close within {:?}; dropping the socket",
                self.settings.close_timeout
            );
            reader.abort();
        }
        writer.abort();

        shared.finish(Some(NORMAL_CLOSURE), "closed by client".to_string());
        info!(session = shared.session, "obs-websocket session closed");
        Ok(())
    }

    async fn call(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, TransportError> {
        let (shared, outbound) = {
            let link = lock(&self.link);
            let link = link.as_ref().ok_or(TransportError::NotOpen)?;
            (Arc::clone(&link.shared), link.outbound.clone())
        };

        let request_id = self.ids.next_id();
        let reply = shared.register(&request_id)?;
        let _slot = ReplySlot {
            shared: &shared,
            id: &request_id,
        };

        let text = encode_message(&ObsMessage::Request(Request {
            request_type: method.to_string(),
            request_id: request_id.clone(),
            request_data: (!params.is_empty()).then_some(params),
        }))?;
        outbound
            .send(WsMessage::Text(text))
            .map_err(|_| TransportError::Closed)?;

        let response = reply.await.map_err(|_| TransportError::Closed)?;
        into_result(response)
    }

    fn signals(&self) -> broadcast::Receiver<TransportSignal> {
        self.signals.subscribe()
    }
}

// ── Session internals ─────────────────────────────────────────────────────────

impl SessionShared {
    fn register(&self, id: &str) -> Result<oneshot::Receiver<RequestResponse>, TransportError> {
        let mut table = lock(&self.replies);
        if !table.open {
            return Err(TransportError::Closed);
        }
        let (tx, rx) = oneshot::channel();
        table.waiting.insert(id.to_string(), tx);
        Ok(rx)
    }

    fn forget(&self, id: &str) {
        lock(&self.replies).waiting.remove(id);
    }

    fn complete(&self, response: RequestResponse) {
        let waiter = lock(&self.replies).waiting.remove(&response.request_id);
        match waiter {
            Some(tx) => {
                // The caller may have given up; nothing to do then.
                let _ = tx.send(response);
            }
            None => debug!(
                session = self.session,
                request_id = %response.request_id,
                "dropping reply with no waiting request"
            ),
        }
    }

    fn handle_text(&self, text: &str) {
        match decode_message(text) {
            Ok(ObsMessage::RequestResponse(response)) => self.complete(response),
            Ok(ObsMessage::Event(event)) => {
                let _ = self.signals.send(TransportSignal::Event(ServerEvent {
                    event_type: event.event_type,
                    event_intent: event.event_intent,
                    data: event.event_data.unwrap_or_default(),
                }));
            }
            Ok(other) => debug!(
                session = self.session,
                op = ?other.op_code(),
                "ignoring unexpected message"
            ),
            Err(e) => {
                warn!(session = self.session, "undecodable frame: {e}");
                let _ = self.signals.send(TransportSignal::Error {
                    session: self.session,
                    message: e.to_string(),
                });
            }
        }
    }

    /// Fails every waiting request and emits `Closed`.  Only the first call
    /// has any effect.
    fn finish(&self, code: Option<u16>, reason: String) {
        if self.finished.swap(true, Ordering::AcqRel) {
            return;
        }
        let abandoned = {
            let mut table = lock(&self.replies);
            table.open = false;
            std::mem::take(&mut table.waiting)
        };
        if !abandoned.is_empty() {
            debug!(
                session = self.session,
                count = abandoned.len(),
                "failing requests still waiting at session end"
            );
        }
        drop(abandoned);
        let _ = self.signals.send(TransportSignal::Closed {
            session: self.session,
            code,
            reason,
        });
    }
}

/// Removes a request's reply slot when the call finishes or is cancelled.
struct ReplySlot<'a> {
    shared: &'a SessionShared,
    id: &'a str,
}

impl Drop for ReplySlot<'_> {
    fn drop(&mut self) {
        self.shared.forget(self.id);
    }
}

fn into_result(response: RequestResponse) -> Result<Map<String, Value>, TransportError> {
    let status = response.request_status;
    if status.result {
        Ok(response.response_data.unwrap_or_default())
    } else {
        Err(TransportError::Remote {
            code: status.code,
            comment: status.comment.unwrap_or_default(),
        })
    }
}

// ── Handshake ─────────────────────────────────────────────────────────────────

struct Negotiated {
    obs_websocket_version: String,
    rpc_version: u32,
}

async fn handshake(
    ws: &mut WsStream,
    target: &ConnectTarget,
    event_subscriptions: u32,
) -> Result<Negotiated, TransportError> {
    let hello = match next_message(ws).await? {
        ObsMessage::Hello(hello) => hello,
        other => {
            return Err(TransportError::Protocol(ProtocolError::UnsupportedOpCode(
                other.op_code(),
            )))
        }
    };

    let authentication = match &hello.authentication {
        Some(challenge) => {
            let password = target
                .password
                .as_deref()
                .ok_or(TransportError::AuthenticationRequired)?;
            Some(authentication_string(
                password,
                &challenge.salt,
                &challenge.challenge,
            ))
        }
        None => None,
    };

    let identify = encode_message(&ObsMessage::Identify(Identify {
        rpc_version: RPC_VERSION,
        authentication,
        event_subscriptions: Some(event_subscriptions),
    }))?;
    ws.send(WsMessage::Text(identify))
        .await
        .map_err(|e| TransportError::WebSocket(e.to_string()))?;

    loop {
        match next_message(ws).await? {
            ObsMessage::Identified(identified) => {
                return Ok(Negotiated {
                    obs_websocket_version: hello.obs_websocket_version,
                    rpc_version: identified.negotiated_rpc_version,
                })
            }
            other => debug!(op = ?other.op_code(), "ignoring message before Identified"),
        }
    }
}

async fn next_message(ws: &mut WsStream) -> Result<ObsMessage, TransportError> {
    while let Some(frame) = ws.next().await {
        match frame.map_err(|e| TransportError::WebSocket(e.to_string()))? {
            WsMessage::Text(text) => return Ok(decode_message(&text)?),
            WsMessage::Close(frame) => {
                let (code, reason) = close_details(frame.as_ref());
                return Err(TransportError::HandshakeRejected {
                    code: code.unwrap_or(1005),
                    reason,
                });
            }
            _ => continue,
        }
    }
    Err(TransportError::Closed)
}

fn close_details(frame: Option<&CloseFrame<'_>>) -> (Option<u16>, String) {
    match frame {
        Some(frame) => {
            let code = u16::from(frame.code);
            let reason = if frame.reason.is_empty() {
                close_code::describe(code).unwrap_or_default().to_string()
            } else {
                frame.reason.to_string()
            };
            (Some(code), reason)
        }
        None => (None, String::new()),
    }
}

// ── I/O tasks ─────────────────────────────────────────────────────────────────

async fn write_loop(
    mut sink: SplitSink<WsStream, WsMessage>,
    mut queue: mpsc::UnboundedReceiver<WsMessage>,
    session: u64,
) {
    while let Some(message) = queue.recv().await {
        let closing = matches!(message, WsMessage::Close(_));
        if let Err(e) = sink.send(message).await {
            debug!(session, "write failed: {e}");
            break;
        }
        if closing {
            break;
        }
    }
}

async fn read_loop(mut source: SplitStream<WsStream>, shared: Arc<SessionShared>) {
    let mut code = None;
    let mut reason = "connection lost".to_string();

    while let Some(frame) = source.next().await {
        match frame {
            Ok(WsMessage::Text(text)) => shared.handle_text(&text),
            Ok(WsMessage::Close(frame)) => {
                (code, reason) = close_details(frame.as_ref());
                debug!(session = shared.session, ?code, %reason, "server sent close");
            }
            Ok(_) => {}
            Err(e) => {
                reason = e.to_string();
                break;
            }
        }
    }

    shared.finish(code, reason);
}

#[cfg(test)]
mod tests {
    use super::*;
    use obs_core::protocol::messages::RequestStatus;

    fn shared(session: u64) -> (SessionShared, broadcast::Receiver<TransportSignal>) {
        let (signals, rx) = broadcast::channel(8);
        (
            SessionShared {
                session,
                replies: Mutex::new(ReplyTable {
                    open: true,
                    waiting: HashMap::new(),
                }),
                finished: AtomicBool::new(false),
                signals,
            },
            rx,
        )
    }

    fn response(id: &str, result: bool) -> RequestResponse {
        RequestResponse {
            request_type: "GetVersion".to_string(),
            request_id: id.to_string(),
            request_status: RequestStatus {
                result,
                code: if result { 100 } else { 600 },
                comment: (!result).then(|| "No scene found".to_string()),
            },
            response_data: None,
        }
    }

    #[tokio::test]
    async fn test_complete_delivers_reply_to_matching_waiter() {
        // Arrange
        let (shared, _rx) = shared(1);
        let a = shared.register("a").unwrap();
        let b = shared.register("b").unwrap();

        // Act – replies arrive out of order
        shared.complete(response("b", true));
        shared.complete(response("a", false));

        // Assert
        assert_eq!(b.await.unwrap().request_id, "b");
        assert_eq!(a.await.unwrap().request_id, "a");
    }

    #[tokio::test]
    async fn test_finish_fails_waiters_and_emits_closed_once() {
        // Arrange
        let (shared, mut rx) = shared(7);
        let waiter = shared.register("x").unwrap();

        // Act
        shared.finish(Some(4009), "authentication failed".to_string());
        shared.finish(None, "second call".to_string());

        // Assert
        assert!(waiter.await.is_err(), "waiter must observe the closure");
        assert_eq!(
            rx.try_recv().unwrap(),
            TransportSignal::Closed {
                session: 7,
                code: Some(4009),
                reason: "authentication failed".to_string()
            }
        );
        assert!(rx.try_recv().is_err(), "Closed must be emitted exactly once");
        assert_eq!(shared.register("y").unwrap_err(), TransportError::Closed);
    }

    #[test]
    fn test_handle_text_forwards_events_and_reports_garbage() {
        let (shared, mut rx) = shared(2);

        shared.handle_text(r#"{"op":5,"d":{"eventType":"StudioModeStateChanged","eventIntent":1,"eventData":{"studioModeEnabled":true}}}"#);
        shared.handle_text("{not json");

        match rx.try_recv().unwrap() {
            TransportSignal::Event(event) => {
                assert_eq!(event.event_type, "StudioModeStateChanged");
                assert_eq!(event.data["studioModeEnabled"], true);
            }
            other => panic!("expected Event, got {other:?}"),
        }
        assert!(matches!(
            rx.try_recv().unwrap(),
            TransportSignal::Error { session: 2, .. }
        ));
    }

    #[test]
    fn test_into_result_maps_failure_status() {
        let err = into_result(response("r", false)).unwrap_err();
        assert_eq!(
            err,
            TransportError::Remote {
                code: 600,
                comment: "No scene found".to_string()
            }
        );
        assert!(into_result(response("r", true)).unwrap().is_empty());
    }

    #[test]
    fn test_reply_slot_forgets_on_drop() {
        let (shared, _rx) = shared(3);
        let _rx_a = shared.register("a").unwrap();
        {
            let _slot = ReplySlot {
                shared: &shared,
                id: "a",
            };
        }
        assert!(lock(&shared.replies).waiting.is_empty());
    }

    #[tokio::test]
    async fn test_call_without_session_is_not_open() {
        let transport = WebSocketTransport::from_config(&SessionConfig::default());
        let result = transport.call("GetVersion", Map::new()).await;
        assert_eq!(result.unwrap_err(), TransportError::NotOpen);
        assert!(transport.disconnect().await.is_ok(), "disconnect without a session is a no-op");
    }
}
