//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads the TOML configuration file from the
//! platform-appropriate directory, writes a default one on request, and turns
//! the file contents into the [`obs_core::SessionConfig`] a connection manager
//! is built from.  A missing file is not an error; the defaults apply.

pub mod config;
