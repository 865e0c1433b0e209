//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the shared,
//! clonable resources handed to every call session.

use crate::config::Config;
use std::sync::Arc;
use switchboard_core::backend::AssistantBackend;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<dyn AssistantBackend>,
    pub config: Arc<Config>,
}
