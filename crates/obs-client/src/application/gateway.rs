//! RpcGateway: the one path from capability code to the server.
//!
//! [`RpcGateway::call`] sends a named request with a JSON object of
//! parameters and returns the response data.  It is also the single place
//! remote failures are logged, at `error`.  The one exception is a failure a
//! capability module declared tolerable up front via
//! [`RpcGateway::call_tolerating`] (a create hitting "already exists", a
//! remove hitting "not found", a toggle hitting "already in that state"),
//! which is logged at `debug` because it is absorbed, not re-raised.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::application::connection_manager::ConnectionManager;
use crate::application::outcome::{absorb, Outcome, Tolerate};
use crate::error::ObsError;

/// Generic correlated request/response calls on the live connection.
#[derive(Clone)]
pub struct RpcGateway {
    manager: Arc<ConnectionManager>,
}

/// Converts a `json!({...})` literal into request parameters.  Anything other
/// than an object becomes an empty map.
pub fn args(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl RpcGateway {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    /// Calls `method` with `params` and returns the response data (an empty
    /// map when the server sent none).
    ///
    /// # Errors
    ///
    /// - [`ObsError::InvalidArgument`] for an empty method name.
    /// - [`ObsError::NotConnected`] when not connected; nothing is sent.
    /// - [`ObsError::ConnectionClosed`] when the connection ends first.
    /// - [`ObsError::RemoteCall`] when the server reports failure.
    pub async fn call(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, ObsError> {
        self.send(method, params, None).await
    }

    /// Like [`RpcGateway::call`], but a remote failure of the `tolerate` kind
    /// is logged at `debug` instead of `error`.  The caller must absorb it.
    pub(crate) async fn call_tolerating(
        &self,
        method: &str,
        params: Map<String, Value>,
        tolerate: Tolerate,
    ) -> Result<Map<String, Value>, ObsError> {
        self.send(method, params, Some(tolerate)).await
    }

    /// Calls a mutating `method` whose `tolerate` failure is a no-op and
    /// reports the [`Outcome`].
    pub(crate) async fn call_outcome(
        &self,
        method: &str,
        params: Map<String, Value>,
        tolerate: Tolerate,
    ) -> Result<Outcome, ObsError> {
        absorb(tolerate, self.call_tolerating(method, params, tolerate).await)
    }

    async fn send(
        &self,
        method: &str,
        params: Map<String, Value>,
        tolerate: Option<Tolerate>,
    ) -> Result<Map<String, Value>, ObsError> {
        if method.trim().is_empty() {
            return Err(ObsError::InvalidArgument(
                "method name must not be empty".to_string(),
            ));
        }

        debug!(method, "calling");
        let result = self.manager.invoke(method, params).await;
        if let Err(e) = &result {
            match e {
                ObsError::RemoteCall {
                    kind,
                    code,
                    message,
                    ..
                } if tolerate.map(Tolerate::kind) == Some(*kind) => {
                    debug!(method, ?code, ?kind, %message, "remote call reported a tolerated failure");
                }
                ObsError::RemoteCall {
                    kind, code, message, ..
                } => {
                    error!(method, ?code, ?kind, %message, "remote call failed");
                }
                ObsError::NotConnected => warn!(method, "call attempted while not connected"),
                other => error!(method, error = %other, "call failed"),
            }
        }
        result
    }

    /// Like [`RpcGateway::call`], deserialising the response into `T`.
    ///
    /// # Errors
    ///
    /// As [`RpcGateway::call`], plus [`ObsError::UnexpectedResponse`] when the
    /// response does not have the shape of `T`.
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<T, ObsError> {
        let data = self.call(method, params).await?;
        serde_json::from_value(Value::Object(data)).map_err(|e| {
            error!(method, error = %e, "response did not have the expected shape");
            ObsError::UnexpectedResponse {
                method: method.to_string(),
                reason: e.to_string(),
            }
        })
    }

    /// Calls `method` and extracts one field of the response as `T`.
    ///
    /// # Errors
    ///
    /// As [`RpcGateway::call_as`]; a missing field is an
    /// [`ObsError::UnexpectedResponse`].
    pub async fn call_field<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
        field: &str,
    ) -> Result<T, ObsError> {
        let data = self.call(method, params).await?;
        take_field(method, data, field)
    }

    /// Like [`RpcGateway::call_field`], but a failure of the tolerated kind
    /// yields `None`.
    pub(crate) async fn call_field_or_none<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
        field: &str,
        tolerate: Tolerate,
    ) -> Result<Option<T>, ObsError> {
        match self.call_tolerating(method, params, tolerate).await {
            Ok(data) => take_field(method, data, field).map(Some),
            Err(e) if e.remote_kind() == Some(tolerate.kind()) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }
}

fn take_field<T: DeserializeOwned>(
    method: &str,
    mut data: Map<String, Value>,
    field: &str,
) -> Result<T, ObsError> {
    let value = data.remove(field).ok_or_else(|| ObsError::UnexpectedResponse {
        method: method.to_string(),
        reason: format!("missing field `{field}`"),
    })?;
    serde_json::from_value(value).map_err(|e| ObsError::UnexpectedResponse {
        method: method.to_string(),
        reason: format!("field `{field}`: {e}"),
    })
}
