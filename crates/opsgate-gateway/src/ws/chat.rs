//! Multi-turn chat relay at GET /start-chat.
//!
//! One fresh `ChatSession` per connection. Submissions go through the
//! streaming form purely to populate the session history; the reply text is
//! read back from the last history entry, never forwarded as partial tokens.

use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use opsgate_model::ChatSession;

use crate::app::AppState;
use crate::ws::{frame::Frame, send};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

async fn run_connection(mut socket: WebSocket, state: Arc<AppState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut session = ChatSession::new(state.model.as_ref());
    info!(conn_id = %conn_id, "chat session started");

    while let Some(msg) = socket.recv().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                warn!(conn_id, error = %e, "read failed");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                let frame: Frame = match serde_json::from_str(&text) {
                    Ok(f) => f,
                    Err(e) => {
                        warn!(conn_id, error = %e, "malformed frame, turn skipped");
                        continue;
                    }
                };

                let started = Instant::now();
                debug!(conn_id, content = %frame.content, "sending chat turn");

                let reply = match session.send(&frame.content, true).await {
                    Ok(r) => r,
                    Err(e) => {
                        // Unrecoverable for this session: its history no
                        // longer advances, so close the connection.
                        error!(conn_id, error = %e, "model call failed, closing connection");
                        break;
                    }
                };

                if send::json(&mut socket, &Frame { content: reply })
                    .await
                    .is_err()
                {
                    warn!(conn_id, "write failed");
                    break;
                }
                debug!(
                    conn_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    history = session.history_len(),
                    "turn complete"
                );
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(conn_id, "chat connection closed");
}
