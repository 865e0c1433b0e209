//! Axum Router Configuration
//!
//! This module defines the routing for the relay service: the per-call
//! WebSocket endpoint the telephony platform connects to, and a liveness
//! probe.

use crate::{state::AppState, ws::ws_handler};
use axum::{Router, routing::get};
use std::sync::Arc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/llm-websocket/{call_id}", get(ws_handler))
        .route("/health", get(health))
        .with_state(app_state)
}

async fn health() -> &'static str {
    "ok"
}
