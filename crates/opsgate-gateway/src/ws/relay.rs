//! Single-turn relay at GET /ai.
//!
//! Every inbound frame is an independent generation request: no session, no
//! retained history. A model failure drops the turn silently: the client
//! receives no reply and no error frame.

use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use opsgate_model::{render::render_response, GenerativeModel, Turn};

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
    info!(conn_id = %conn_id, "new single-turn relay connection");

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
                let resp = match state.model.generate(&[Turn::user(frame.content)]).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(conn_id, error = %e, "model call failed, turn dropped");
                        continue;
                    }
                };

                let rendered = render_response(&resp);
                info!(conn_id, len = rendered.len(), "model response");

                if send::json(&mut socket, &Frame { content: rendered })
                    .await
                    .is_err()
                {
                    warn!(conn_id, "write failed");
                    break;
                }
                debug!(
                    conn_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "turn complete"
                );
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    info!(conn_id, "single-turn relay connection closed");
}
