//! Infrastructure layer for the OBS client.
//!
//! Contains the OS-facing adapters: the WebSocket transport (plus its
//! in-memory stand-in) and file-system storage for the configuration file.

pub mod storage;
pub mod transport;
