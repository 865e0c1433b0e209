//! WebSocket Session Management
//!
//! Handles the persistent per-call connection from the telephony platform:
//! the `session` submodule owns the connection lifecycle, from upgrade to
//! hang-up, and drives the conversation relay for each inbound event.

pub mod session;

pub use session::ws_handler;
