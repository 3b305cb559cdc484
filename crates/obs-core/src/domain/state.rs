//! Connection lifecycle state.

use std::fmt;

/// The lifecycle state of a connection manager.
///
/// ```text
///                 connect()                handshake ok
///  Disconnected ─────────────▶ Connecting ───────────────▶ Connected
///       ▲                          │                          │
///       │      handshake failed    │                          │ unsolicited close
///       ├──────────────────────────┘                          │ (auto-reconnect on)
///       │                                                     ▼
///       │      attempts exhausted / disconnect()        Reconnecting
///       └─────────────────────────────────────────────────────┘
/// ```
///
/// Calls are only allowed in `Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

impl ConnectionState {
    /// Returns `true` iff the state is exactly [`ConnectionState::Connected`].
    pub fn is_connected(self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Reconnecting.is_connected());
        assert!(!ConnectionState::Disconnected.is_connected());
    }

    #[test]
    fn test_display_is_lowercase() {
        assert_eq!(ConnectionState::Reconnecting.to_string(), "reconnecting");
    }
}
