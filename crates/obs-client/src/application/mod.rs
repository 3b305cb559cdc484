//! Application layer of the OBS client.
//!
//! # What lives here? (for beginners)
//!
//! The application layer turns "what the user wants" into calls on the
//! transport, without knowing how bytes reach the server:
//!
//! - **`connection_manager`** – Owns the transport, the connection state, and
//!   the reconnection loop.  The only component that talks to the transport.
//!
//! - **`gateway`** – The generic "call a named method with parameters" seam
//!   every capability uses.  Refuses calls while disconnected and logs remote
//!   failures once.
//!
//! - **`events`** – Ordered event handlers with failure isolation.
//!
//! - **`pending`** – Bookkeeping that guarantees every in-flight call is
//!   rejected when the connection ends.
//!
//! - **`scene`**, **`input`**, **`output`**, **`studio`** – Capability
//!   modules: stateless facades over the gateway that re-check existence
//!   before mutating.  A create or remove with nothing to do is reported as
//!   an [`outcome::Outcome`]; other server failures propagate.

pub mod connection_manager;
pub mod events;
pub mod gateway;
pub mod input;
pub mod outcome;
pub mod output;
pub mod pending;
pub mod scene;
pub mod studio;
