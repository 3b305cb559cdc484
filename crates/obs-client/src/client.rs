//! `ObsClient`: the one-stop facade.
//!
//! Wires a transport, a [`ConnectionManager`], an [`RpcGateway`], and the
//! capability modules together.  Cloning is cheap; every clone drives the
//! same connection.
//!
//! ```rust,no_run
//! use obs_client::{ConnectOptions, ObsClient, SessionConfig};
//!
//! # async fn demo() -> Result<(), obs_client::ObsError> {
//! let client = ObsClient::new(SessionConfig::default())?;
//! client.connect(ConnectOptions::none()).await?;
//! client.scenes().create("Interview").await?;
//! client.scenes().switch("Interview").await?;
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use obs_core::{ConnectOptions, ConnectionState, SessionConfig};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::application::connection_manager::ConnectionManager;
use crate::application::events::SubscriptionId;
use crate::application::gateway::RpcGateway;
use crate::application::input::InputModule;
use crate::application::output::OutputModule;
use crate::application::scene::SceneModule;
use crate::application::studio::StudioModule;
use crate::error::ObsError;
use crate::infrastructure::transport::websocket::WebSocketTransport;
use crate::infrastructure::transport::{HandshakeInfo, ServerEvent, Transport};

/// Remote control for one OBS instance.
#[derive(Clone)]
pub struct ObsClient {
    manager: Arc<ConnectionManager>,
    gateway: RpcGateway,
}

impl ObsClient {
    /// A client speaking obs-websocket over a real WebSocket.
    ///
    /// # Errors
    ///
    /// Returns [`ObsError::Configuration`] if `config` fails validation.
    pub fn new(config: SessionConfig) -> Result<Self, ObsError> {
        let transport = Arc::new(WebSocketTransport::from_config(&config));
        Self::with_transport(config, transport)
    }

    /// A client over any [`Transport`], e.g. the in-memory fake.
    ///
    /// # Errors
    ///
    /// Returns [`ObsError::Configuration`] if `config` fails validation.
    pub fn with_transport(config: SessionConfig, transport: Arc<dyn Transport>) -> Result<Self, ObsError> {
        let manager = ConnectionManager::new(config, transport)?;
        let gateway = RpcGateway::new(Arc::clone(&manager));
        Ok(Self { manager, gateway })
    }

    // ── Connection ────────────────────────────────────────────────────────────

    /// See [`ConnectionManager::connect`].
    pub async fn connect(&self, options: ConnectOptions) -> Result<HandshakeInfo, ObsError> {
        self.manager.connect(options).await
    }

    /// See [`ConnectionManager::disconnect`].
    pub async fn disconnect(&self) -> Result<(), ObsError> {
        self.manager.disconnect().await
    }

    pub fn is_connected(&self) -> bool {
        self.manager.is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.manager.state_changes()
    }

    pub fn handshake(&self) -> Option<HandshakeInfo> {
        self.manager.handshake()
    }

    /// Waits for an in-flight reconnection loop to finish.
    pub async fn reconnection_settled(&self) {
        self.manager.reconnection_settled().await
    }

    // ── Raw calls ─────────────────────────────────────────────────────────────

    /// See [`RpcGateway::call`].
    pub async fn call(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<Map<String, Value>, ObsError> {
        self.gateway.call(method, params).await
    }

    /// See [`RpcGateway::call_as`].
    pub async fn call_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Map<String, Value>,
    ) -> Result<T, ObsError> {
        self.gateway.call_as(method, params).await
    }

    // ── Events ────────────────────────────────────────────────────────────────

    /// Runs `handler` for every event of `event_type` (`"*"` for all).
    pub fn on<F>(&self, event_type: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.manager.events().on(event_type, handler)
    }

    /// Removes a handler.  Returns `false` if it was already removed.
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.manager.events().off(id)
    }

    // ── Capabilities ──────────────────────────────────────────────────────────

    pub fn scenes(&self) -> SceneModule {
        SceneModule::new(self.gateway.clone())
    }

    pub fn inputs(&self) -> InputModule {
        InputModule::new(self.gateway.clone())
    }

    pub fn outputs(&self) -> OutputModule {
        OutputModule::new(self.gateway.clone())
    }

    pub fn studio(&self) -> StudioModule {
        StudioModule::new(self.gateway.clone())
    }

    pub fn gateway(&self) -> &RpcGateway {
        &self.gateway
    }
}
