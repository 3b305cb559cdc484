//! Session configuration.
//!
//! A [`SessionConfig`] is fixed when a connection manager is constructed.
//! Individual `connect()` calls may override the endpoint and password with
//! [`ConnectOptions`]; [`SessionConfig::resolve_target`] combines the two into
//! the concrete [`ConnectTarget`] handed to the transport.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::messages::event_subscription;

/// Endpoint used when neither the connect options nor the config name one.
pub const DEFAULT_URL: &str = "ws://localhost:4455";

/// Required configuration is missing or invalid.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid configuration: {0}")]
pub struct ConfigurationError(pub String);

/// Immutable settings for one connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// WebSocket endpoint.  `None` means [`DEFAULT_URL`].
    pub url: Option<String>,
    /// Shared secret.  `None` means an unauthenticated connection.
    pub password: Option<String>,
    /// How many reconnection attempts follow an unsolicited close.  At least 1.
    pub retry_attempts: u32,
    /// Wait between reconnection attempts.
    pub retry_delay: Duration,
    /// Whether an unsolicited close starts the reconnection loop.
    pub auto_reconnect: bool,
    /// Extra pause after a successful connect and after a disconnect.
    /// Zero unless a particular server build needs time to settle.
    pub settle_delay: Duration,
    /// Upper bound on the Hello / Identify / Identified exchange.
    pub handshake_timeout: Duration,
    /// How long `disconnect()` waits for the server to acknowledge the close.
    pub close_timeout: Duration,
    /// Event categories requested in `Identify`.
    pub event_subscriptions: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            url: None,
            password: None,
            retry_attempts: 3,
            retry_delay: Duration::from_millis(3000),
            auto_reconnect: false,
            settle_delay: Duration::ZERO,
            handshake_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(2),
            event_subscriptions: event_subscription::ALL,
        }
    }
}

impl SessionConfig {
    /// Checks the invariants that cannot be expressed by the field types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if `retry_attempts` is zero or `url` is
    /// present but unusable.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.retry_attempts == 0 {
            return Err(ConfigurationError(
                "retry_attempts must be at least 1".to_string(),
            ));
        }
        if let Some(url) = &self.url {
            check_url(url)?;
        }
        Ok(())
    }

    /// Combines per-connect overrides with this config.
    ///
    /// Resolution order for each field is: option, then config, then the
    /// compiled-in default.  An empty password counts as no password.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError`] if the resolved URL is empty or is not a
    /// `ws://` / `wss://` URL.
    pub fn resolve_target(&self, options: &ConnectOptions) -> Result<ConnectTarget, ConfigurationError> {
        let url = options
            .url
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or(DEFAULT_URL)
            .trim()
            .to_string();
        check_url(&url)?;

        let password = options
            .password
            .clone()
            .or_else(|| self.password.clone())
            .filter(|p| !p.is_empty());

        Ok(ConnectTarget { url, password })
    }
}

fn check_url(url: &str) -> Result<(), ConfigurationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ConfigurationError("endpoint URL is empty".to_string()));
    }
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(ConfigurationError(format!(
            "endpoint URL must start with ws:// or wss://, got {url:?}"
        )));
    }
    Ok(())
}

/// Per-call overrides for `connect()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectOptions {
    pub url: Option<String>,
    pub password: Option<String>,
}

impl ConnectOptions {
    /// Overrides nothing; the session config applies as-is.
    pub fn none() -> Self {
        Self::default()
    }

    /// Overrides the endpoint URL.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            password: None,
        }
    }

    /// Adds a password override.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

/// The fully resolved endpoint a transport connects to.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub url: String,
    pub password: Option<String>,
}

// Hand-written so the password never reaches a log line.
impl std::fmt::Debug for ConnectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectTarget")
            .field("url", &self.url)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
