//! Switchboard API Library Crate
//!
//! This library contains the service-side logic for the conversation relay:
//! configuration loading, shared application state, the WebSocket session
//! handling, and routing. The `relay` binary is a thin wrapper around it.

pub mod config;
pub mod router;
pub mod state;
pub mod ws;
