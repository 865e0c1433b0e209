//! Main Entrypoint for the Switchboard Relay Service
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Constructing the assistant backend client and shared state.
//! 4. Starting the web server and handling graceful shutdown.

use anyhow::Context;
use async_openai::config::OpenAIConfig;
use std::sync::Arc;
use switchboard_api::{config::Config, router::create_router, state::AppState};
use switchboard_core::backend::OpenAIAssistantBackend;
use tracing::info;

/// Listens for the `Ctrl+C` signal to gracefully shut down the server.
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    info!("Received shutdown signal. Shutting down gracefully...");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!("Configuration loaded. Initializing application state...");

    let openai_config = OpenAIConfig::new().with_api_key(&config.openai_api_key);
    let backend = Arc::new(OpenAIAssistantBackend::new(
        openai_config,
        config.assistant_id.clone(),
    ));

    let app_state = Arc::new(AppState {
        backend,
        config: Arc::new(config.clone()),
    });
    let app = create_router(app_state);

    info!(
        assistant_id = %config.assistant_id,
        bind_address = %config.bind_address,
        "Service configured. Starting server..."
    );
    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server has shut down.");
    Ok(())
}
