//! Domain entities for the OBS remote-control client.
//!
//! This module contains pure data and validation rules with no
//! infrastructure dependencies: no sockets, no async runtime, no file I/O.
//! Code in `obs-client` depends on these types, never the other way round,
//! which keeps them trivially unit-testable.

/// Session configuration and per-connect target resolution.
pub mod config;

/// Scene, input, and output data returned by the server.
pub mod entities;

/// The connection lifecycle state.
pub mod state;
