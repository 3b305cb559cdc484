//! obsctl library: argument definitions, command dispatch, and the
//! multi-step workflows.
//!
//! The binary in `main.rs` is a thin shell over this crate so integration
//! tests can drive every command against the in-memory transport.

pub mod cli;
pub mod commands;
pub mod workflows;
