//! WebSocket state stream for the views.
//!
//! Connection lifecycle:
//! 1. View opens `GET /ws/state` — upgraded without auth (local demo)
//! 2. Server sends the current snapshot immediately
//! 3. Every controller transition pushes a fresh `State` message
//! 4. Heartbeat every 30s keeps idle connections alive
//!
//! The underlying `watch` channel is last-write-wins: a slow client
//! skips intermediate snapshots instead of buffering them.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;

use crate::api::types::ApiContext;
use crate::controller::SosSnapshot;

/// Heartbeat interval: server pings every 30 seconds.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Messages pushed to the views.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum WsOutgoing {
    /// A fresh state snapshot after a transition.
    State { snapshot: SosSnapshot },
    /// Keep-alive tick.
    Heartbeat { server_time: String },
}

/// WebSocket upgrade handler.
pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(ctx): State<ApiContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, ctx))
}

/// Push snapshots until the client disconnects.
async fn handle_ws(socket: WebSocket, ctx: ApiContext) {
    let (mut sink, mut stream) = socket.split();
    let mut updates = ctx.controller.subscribe();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.tick().await; // consume the immediate first tick

    // Current state first so the view renders without waiting for a
    // transition.
    let initial = updates.borrow_and_update().clone();
    if send_state(&mut sink, initial).await.is_err() {
        return;
    }
    tracing::debug!("State stream connected");

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    // Controller gone — shutting down
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if send_state(&mut sink, snapshot).await.is_err() {
                    break;
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    // The stream is one-way; client text is ignored
                    _ => {}
                }
            }
            _ = heartbeat.tick() => {
                let beat = WsOutgoing::Heartbeat {
                    server_time: chrono::Utc::now().to_rfc3339(),
                };
                if send_json(&mut sink, &beat).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;
    tracing::debug!("State stream disconnected");
}

async fn send_state(
    sink: &mut (impl SinkExt<Message> + Unpin),
    snapshot: SosSnapshot,
) -> Result<(), ()> {
    send_json(sink, &WsOutgoing::State { snapshot }).await
}

async fn send_json(
    sink: &mut (impl SinkExt<Message> + Unpin),
    message: &WsOutgoing,
) -> Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|_| ())?;
    sink.send(Message::Text(json)).await.map_err(|_| ())
}
