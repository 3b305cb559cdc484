//! # obs-core
//!
//! Shared library for the OBS remote-control client containing the
//! obs-websocket v5 message types, the JSON codec, the handshake
//! authentication helper, remote-error classification, and the domain
//! entities (session configuration, connection state, scenes, inputs,
//! outputs).
//!
//! This crate has zero dependencies on sockets or async runtimes.  Everything
//! that performs I/O lives in `obs-client`.
//!
//! # Architecture overview
//!
//! OBS Studio exposes a control plane over WebSocket ("obs-websocket").  A
//! client opens a connection, completes a Hello → Identify → Identified
//! handshake, then issues correlated Request / RequestResponse pairs while the
//! server pushes Event messages asynchronously.
//!
//! - **`protocol`** – How JSON travels over the socket: the `{"op", "d"}`
//!   envelope, the typed payloads for every opcode, and the request-id
//!   sequence used for correlation.
//!
//! - **`auth`** – The salted SHA-256 challenge response sent in `Identify`.
//!
//! - **`error`** – Classification of the server's untyped failure reports
//!   into a small set of kinds that callers can act on.
//!
//! - **`domain`** – Pure data: `SessionConfig`, `ConnectionState`, and the
//!   scene / input / output entities returned by the server.

pub mod auth;
pub mod domain;
pub mod error;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `obs_core::SessionConfig` instead of `obs_core::domain::config::SessionConfig`.
pub use domain::config::{
    ConfigurationError, ConnectOptions, ConnectTarget, SessionConfig, DEFAULT_URL,
};
pub use domain::state::ConnectionState;
pub use error::{classify_remote_error, RemoteErrorKind};
pub use protocol::codec::{decode_message, encode_message, ProtocolError};
pub use protocol::messages::ObsMessage;
