//! The public error taxonomy of the OBS client.
//!
//! Every fallible operation on [`crate::ObsClient`] and the capability modules
//! returns [`ObsError`].  Remote failures keep the server's status code and a
//! [`RemoteErrorKind`] so callers can branch on the kind instead of matching
//! message text.

use obs_core::{classify_remote_error, ConfigurationError, RemoteErrorKind};
use thiserror::Error;

use crate::infrastructure::transport::TransportError;

/// Errors surfaced by the OBS client.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ObsError {
    /// Required configuration is missing or invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// A connection attempt failed.
    #[error("connection failed: {0}")]
    Connection(#[source] TransportError),

    /// A call was attempted while not connected.
    #[error("not connected to OBS")]
    NotConnected,

    /// The connection ended while the call was in flight.
    #[error("connection closed while `{method}` was pending")]
    ConnectionClosed { method: String },

    /// The server processed the call and reported failure.
    #[error("`{method}` failed ({kind:?}): {message}")]
    RemoteCall {
        method: String,
        code: Option<u16>,
        kind: RemoteErrorKind,
        message: String,
    },

    /// An argument was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The server replied, but not with the shape the caller expected.
    #[error("unexpected response to `{method}`: {reason}")]
    UnexpectedResponse { method: String, reason: String },
}

impl ObsError {
    /// The classified kind of a remote failure; `None` for every other error.
    pub fn remote_kind(&self) -> Option<RemoteErrorKind> {
        match self {
            ObsError::RemoteCall { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Translates a transport failure of the call `method`.
    pub(crate) fn from_call(method: &str, error: TransportError) -> Self {
        match error {
            TransportError::Remote { code, comment } => ObsError::RemoteCall {
                method: method.to_string(),
                code: Some(code),
                kind: classify_remote_error(Some(code), &comment),
                message: comment,
            },
            TransportError::Closed | TransportError::NotOpen => ObsError::ConnectionClosed {
                method: method.to_string(),
            },
            other => {
                let message = other.to_string();
                ObsError::RemoteCall {
                    method: method.to_string(),
                    code: None,
                    kind: classify_remote_error(None, &message),
                    message,
                }
            }
        }
    }
}
