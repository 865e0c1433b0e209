//! Switchboard Core
//!
//! Domain logic for relaying voice-call transcript events to a hosted
//! assistant service and streaming the assistant's reply back to the
//! telephony platform. The service crate wires these pieces to a
//! WebSocket server; everything here is transport-agnostic:
//!
//! - `protocol`: the JSON message format spoken with the telephony platform.
//! - `backend`: the seam over the assistant service (threads, runs, streaming).
//! - `relay`: the per-call conversation relay built on top of both.

pub mod backend;
pub mod protocol;
pub mod relay;
