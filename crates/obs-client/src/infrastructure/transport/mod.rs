//! The Transport Session seam.
//!
//! A transport owns at most one live obs-websocket session at a time.  It
//! performs the Hello / Identify / Identified handshake, correlates requests
//! with their replies, and reports lifecycle changes and server events as
//! [`TransportSignal`]s on a broadcast channel.
//!
//! # Testability
//!
//! The [`Transport`] trait lets the connection manager be driven by:
//!
//! - [`websocket::WebSocketTransport`] in production (tokio-tungstenite),
//! - [`fake::FakeTransport`], a scriptable in-memory server, in scenario tests,
//! - `MockTransport` (generated by `mockall`) in unit tests that assert exact
//!   call expectations.

use std::time::Duration;

use async_trait::async_trait;
use obs_core::{ConnectTarget, ProtocolError};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

pub mod fake;
pub mod websocket;

/// Capacity of every transport's signal channel.  Receivers that fall this
/// far behind observe `RecvError::Lagged` and skip ahead.
pub const SIGNAL_CHANNEL_CAPACITY: usize = 256;

/// Errors reported by a transport.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The underlying socket or WebSocket layer failed.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The connection or handshake did not complete in time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The server asked for authentication but no password is configured.
    #[error("server requires a password but none was configured")]
    AuthenticationRequired,

    /// The server closed the socket during the handshake.
    #[error("server closed the connection during the handshake (code {code}): {reason}")]
    HandshakeRejected { code: u16, reason: String },

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// No session is open.
    #[error("no open session")]
    NotOpen,

    /// The session ended before the reply arrived.
    #[error("session closed before a reply arrived")]
    Closed,

    /// The server processed the request and reported failure.
    #[error("request failed with status {code}: {comment}")]
    Remote { code: u16, comment: String },
}

/// What the server reported at the end of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeInfo {
    /// obs-websocket plugin version, e.g. `"5.4.2"`.
    pub obs_websocket_version: String,
    /// RPC version both sides agreed on.
    pub rpc_version: u32,
    /// Transport-local session number.  Strictly increasing per transport.
    pub session: u64,
}

/// An event pushed by the server, or synthesised by the connection manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    pub event_type: String,
    /// Subscription category bit; 0 for synthesised connection events.
    pub event_intent: u32,
    pub data: Map<String, Value>,
}

impl ServerEvent {
    /// Creates an event with no subscription category.
    pub fn new(event_type: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            event_type: event_type.into(),
            event_intent: 0,
            data,
        }
    }
}

/// Asynchronous notifications from a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportSignal {
    /// A session completed its handshake.
    Opened { session: u64 },
    /// A session ended.  Emitted exactly once per session, whoever closed it.
    Closed {
        session: u64,
        code: Option<u16>,
        reason: String,
    },
    /// A non-fatal problem on a live session (undecodable frame, etc.).
    Error { session: u64, message: String },
    /// The server pushed an event.
    Event(ServerEvent),
}

/// A single-session obs-websocket connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Opens a socket to `target`, completes the handshake, and returns the
    /// negotiated versions.  Any previous session is torn down first.
    async fn connect(&self, target: &ConnectTarget) -> Result<HandshakeInfo, TransportError>;

    /// Closes the current session, waiting for the server's acknowledgement
    /// up to the configured close timeout.  A no-op when nothing is open.
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// Sends one request and awaits its correlated reply.  Absent response
    /// data is returned as an empty map.
    async fn call(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, TransportError>;

    /// Subscribes to this transport's signals.
    fn signals(&self) -> broadcast::Receiver<TransportSignal>;
}
