//! Manages the per-call WebSocket connection from the telephony platform.

use crate::state::AppState;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use std::sync::Arc;
use switchboard_core::{
    protocol::{InboundEvent, OutboundMessage},
    relay::ConversationRelay,
};
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tracing::{Instrument, error, info, warn};

/// Axum handler to upgrade the platform's HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(call_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| {
        let span = tracing::info_span!("call_session", %call_id);
        handle_socket(socket, state).instrument(span)
    })
}

/// Main handler for an individual call connection.
///
/// Opens the conversation with the assistant backend, then relays every
/// transcript or reminder event into a drafting turn. A new event supersedes
/// a still-streaming turn: the old turn task is aborted before the next one
/// starts, on top of the relay's own best-effort backend run cancellation,
/// so only the newest turn's output reaches the platform.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    info!("Call connected. Opening conversation with assistant backend...");

    let (socket_tx, mut socket_rx) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<OutboundMessage>(64);
    let writer_handle = spawn_writer(socket_tx, outbound_rx);

    let mut relay = ConversationRelay::new(state.backend.clone());
    if let Err(e) = relay.begin(&outbound_tx).await {
        error!(error = ?e, "Failed to open conversation; dropping call");
        writer_handle.abort();
        return;
    }

    let relay = Arc::new(Mutex::new(relay));
    let mut turn_handle: Option<JoinHandle<()>> = None;

    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let event = match serde_json::from_str::<InboundEvent>(&text) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = ?e, "Ignoring unparseable inbound frame");
                        continue;
                    }
                };

                match event {
                    InboundEvent::UpdateOnly { .. } => {}
                    event => {
                        if let Some(handle) = turn_handle.take() {
                            handle.abort();
                        }
                        let relay = relay.clone();
                        let outbound_tx = outbound_tx.clone();
                        turn_handle = Some(tokio::spawn(
                            async move {
                                let mut relay = relay.lock().await;
                                if let Err(e) = relay.draft_response(&event, &outbound_tx).await {
                                    error!(error = ?e, "Turn ended with unrecoverable error");
                                }
                            }
                            .in_current_span(),
                        ));
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!("Platform sent close frame. Ending call session.");
                break;
            }
            Ok(Message::Binary(_)) | Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Err(e) => {
                error!(error = ?e, "Error receiving from platform WebSocket");
                break;
            }
        }
    }

    // Clean up background tasks on exit.
    if let Some(handle) = turn_handle.take() {
        handle.abort();
    }
    drop(outbound_tx);
    let _ = writer_handle.await;
    info!("Call session terminated.");
}

/// Spawns the task that serializes relay output onto the socket as JSON
/// text frames. Exits when all senders drop or the socket rejects a send.
fn spawn_writer(
    mut socket_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<OutboundMessage>,
) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            while let Some(msg) = outbound_rx.recv().await {
                match serde_json::to_string(&msg) {
                    Ok(serialized) => {
                        if socket_tx.send(Message::Text(serialized.into())).await.is_err() {
                            warn!("Platform WebSocket closed; stopping outbound writer");
                            break;
                        }
                    }
                    Err(e) => error!(error = ?e, "Failed to serialize outbound message"),
                }
            }
        }
        .in_current_span(),
    )
}
