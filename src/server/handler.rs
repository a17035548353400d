//! WebSocket connection handlers and operational HTTP endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    common::time::millis_to_rfc3339,
    protocol::decode_frame,
    relay::RelayChannel,
};

use super::state::AppState;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Spawns a task that drains the connection's mpsc channel into the
/// WebSocket sink. This is the outbound half: frames broadcast by the
/// router land in `rx` and are written to this client here.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sender, mut receiver) = socket.split();

    // Register the connection; the generated identity keys all further
    // bookkeeping for this socket.
    let (tx, rx) = mpsc::unbounded_channel();
    let conn = {
        let mut router = state.router.lock().await;
        router.connect(RelayChannel::new(tx))
    };

    let state_clone = state.clone();

    // Receive loop: events are processed in arrival order for this
    // connection, each handler running to completion under the router lock.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error on '{}': {}", conn, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => match decode_frame(&text) {
                    Ok(event) => {
                        let mut router = state_clone.router.lock().await;
                        router.dispatch(conn, event);
                    }
                    Err(e) => {
                        // malformed frame: drop it, keep the connection
                        tracing::warn!("Dropping malformed frame from '{}': {}", conn, e);
                    }
                },
                Message::Ping(_) => {
                    tracing::debug!("Received ping from '{}'", conn);
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(frame) => {
                    match frame {
                        Some(frame) => tracing::info!(
                            "Connection '{}' requested close (code {}, reason '{}')",
                            conn,
                            frame.code,
                            frame.reason.as_str()
                        ),
                        None => tracing::info!("Connection '{}' requested close", conn),
                    }
                    break;
                }
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Closure, whatever its cause, is the only lifecycle-ending signal.
    let mut router = state.router.lock().await;
    router.handle_disconnect(conn);
}

/// Summary of one active room, for `GET /api/rooms`.
#[derive(Debug, Serialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub players: Vec<String>,
    pub full: bool,
    pub created_at: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get list of active rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let router = state.router.lock().await;

    let mut summaries: Vec<RoomSummaryDto> = router
        .rooms()
        .iter()
        .map(|room| RoomSummaryDto {
            id: room.id.as_str().to_string(),
            players: room
                .player_ids()
                .into_iter()
                .map(|p| p.as_str().to_string())
                .collect(),
            full: room.is_full(),
            created_at: millis_to_rfc3339(room.created_at),
        })
        .collect();
    summaries.sort_by(|a, b| a.id.cmp(&b.id));

    Json(summaries)
}
