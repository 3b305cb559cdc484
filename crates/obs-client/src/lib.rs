//! obs-client library entry point.
//!
//! Remote control for OBS Studio over obs-websocket v5: a connection manager
//! with automatic reconnection, a correlated RPC gateway, event subscription,
//! and capability modules for scenes, inputs, outputs, and studio mode.
//!
//! Start with [`ObsClient`].  Integration tests and the `obsctl` binary use
//! the same module tree re-exported here.

pub mod application;
pub mod client;
pub mod error;
pub mod infrastructure;

pub use application::events::{
    SubscriptionId, ANY_EVENT, CONNECTION_CLOSED, CONNECTION_ERROR, CONNECTION_OPENED,
};
pub use application::gateway::{args, RpcGateway};
pub use application::outcome::{Outcome, Refusal};
pub use client::ObsClient;
pub use error::ObsError;
pub use infrastructure::transport::{HandshakeInfo, ServerEvent, Transport, TransportError};
pub use obs_core::{ConnectOptions, ConnectionState, RemoteErrorKind, SessionConfig};
