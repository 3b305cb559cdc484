//! TOML-based configuration for the OBS remote client.
//!
//! Reads and writes [`AppConfig`] at the platform-appropriate location:
//! - Windows:  `%APPDATA%\ObsRemote\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/obs-remote/config.toml` (or `~/.config/...`)
//! - macOS:    `~/Library/Application Support/ObsRemote/config.toml`
//!
//! # What is TOML? (for beginners)
//!
//! TOML is a configuration file format designed to be easy to read and write.
//! A complete file for this client looks like:
//!
//! ```toml
//! [connection]
//! url = "ws://192.168.1.20:4455"
//! password = "hunter2"
//! retry_attempts = 5
//! retry_delay_ms = 2000
//! auto_reconnect = true
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]`, so a file may name only the
//! settings it changes.  A file with no sections at all is valid and yields
//! [`AppConfig::default()`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use obs_core::protocol::messages::event_subscription;
use obs_core::{SessionConfig, DEFAULT_URL};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reading or writing the obsctl config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `--config` nor a platform config directory is available.
    #[error("no config directory for this platform; pass --config")]
    NoPlatformConfigDir,

    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot encode config as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub connection: ConnectionSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Endpoint and reconnection settings.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionSection {
    /// WebSocket endpoint of the obs-websocket server.
    #[serde(default = "default_url")]
    pub url: String,
    /// Server password.  Omitted from the file when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Reconnection attempts after an unsolicited close.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Milliseconds between reconnection attempts.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Whether an unsolicited close triggers reconnection.
    #[serde(default)]
    pub auto_reconnect: bool,
    /// Pause after connect and disconnect, in milliseconds.
    #[serde(default)]
    pub settle_delay_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSection {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_url() -> String {
    DEFAULT_URL.to_string()
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    3000
}
fn default_handshake_timeout_ms() -> u64 {
    10_000
}
fn default_close_timeout_ms() -> u64 {
    2_000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectionSection {
    fn default() -> Self {
        Self {
            url: default_url(),
            password: None,
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            auto_reconnect: false,
            settle_delay_ms: 0,
            handshake_timeout_ms: default_handshake_timeout_ms(),
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Hand-written so `config show` and debug logs never print the password.
impl std::fmt::Debug for ConnectionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSection")
            .field("url", &self.url)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("retry_attempts", &self.retry_attempts)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("auto_reconnect", &self.auto_reconnect)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("handshake_timeout_ms", &self.handshake_timeout_ms)
            .field("close_timeout_ms", &self.close_timeout_ms)
            .finish()
    }
}

impl AppConfig {
    /// Converts the file settings into a [`SessionConfig`].
    ///
    /// Validation is left to the connection manager, which rejects the
    /// result with a `ConfigurationError` if it is unusable.
    pub fn to_session_config(&self) -> SessionConfig {
        let c = &self.connection;
        SessionConfig {
            url: Some(c.url.clone()),
            password: c.password.clone().filter(|p| !p.is_empty()),
            retry_attempts: c.retry_attempts,
            retry_delay: Duration::from_millis(c.retry_delay_ms),
            auto_reconnect: c.auto_reconnect,
            settle_delay: Duration::from_millis(c.settle_delay_ms),
            handshake_timeout: Duration::from_millis(c.handshake_timeout_ms),
            close_timeout: Duration::from_millis(c.close_timeout_ms),
            event_subscriptions: event_subscription::ALL,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// The obs-remote directory under the platform config base.
///
/// # Errors
///
/// [`ConfigError::NoPlatformConfigDir`] if the environment names no base
/// directory (no `XDG_CONFIG_HOME`/`HOME`, `APPDATA`, or an unknown OS).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// `config.toml` inside [`config_dir`].
///
/// # Errors
///
/// See [`config_dir`].
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads [`AppConfig`] from the default location, returning defaults if the
/// file does not exist yet.
///
/// # Errors
///
/// [`ConfigError::Io`] when the file exists but cannot be read, and
/// [`ConfigError::Parse`] when it is not valid for [`AppConfig`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads [`AppConfig`] from `path`, returning defaults if the file does not
/// exist.
///
/// # Errors
///
/// See [`load_config`].
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Persists `config` to the default location.
///
/// # Errors
///
/// [`ConfigError::Io`] if the directory or file cannot be written.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&config_file_path()?, config)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// See [`save_config`].
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the app subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("ObsRemote"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("obs-remote"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("ObsRemote")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
