//! WebSocket upgrade handler.
//!
//! Wires an upgraded socket into the distribution core: generates a
//! session id, registers the session's outbound queue with the
//! coordinator, runs the reader inline with the writer spawned beside it,
//! and unregisters on the way out whichever task fails first.

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::info;

use super::coordinator::SessionEntry;
use super::session::{SessionId, read_pump, write_pump};
use crate::state::AppState;

/// WebSocket upgrade handler for `GET /api/v1/ws/stocks`.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = SessionId::generate();
    info!(%session_id, "new websocket connection");

    let config = state.config.websocket.clone();
    let coordinator = state.coordinator.clone();

    let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity);
    let (closed_tx, closed_rx) = watch::channel(false);

    coordinator.register(SessionEntry {
        id: session_id,
        queue: queue_tx.clone(),
        closed: closed_tx,
    });

    let (sink, stream) = socket.split();

    let writer = tokio::spawn(write_pump(
        sink,
        session_id,
        queue_rx,
        coordinator.clone(),
        config.clone(),
        closed_rx.clone(),
    ));

    read_pump(
        stream,
        session_id,
        queue_tx,
        coordinator.clone(),
        config,
        closed_rx,
    )
    .await;

    // Unregister fires the close signal, which the writer observes; the
    // writer's own fatal errors also unregister, making this a no-op then
    coordinator.unregister(session_id);
    let _ = writer.await;

    info!(%session_id, "websocket connection closed");
}
