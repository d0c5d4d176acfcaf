//! Operations relay at GET /ops.
//!
//! The model is primed to reply with literal, non-interactive shell command
//! lines; each reply is executed and its captured output is sent back to the
//! client. A failing command gets exactly one automatic repair turn: the
//! failure output is reported to the model and whatever it returns is
//! executed unconditionally; no further retries.

use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use opsgate_exec::UntrustedRunner;
use opsgate_model::{ChatSession, GenerativeModel, ModelError};

use crate::app::AppState;
use crate::ws::{frame::Frame, send};

/// Sentinel command the model returns to signal task completion. Inert when
/// executed, but the relay short-circuits it before any model or shell call.
pub const SENTINEL_DONE: &str = "echo true";

/// Sentinel command the model returns when it does not know what to do.
pub const SENTINEL_UNKNOWN: &str = "echo false";

/// Primer establishing the command-line-only reply convention. Sent as the
/// first (non-streamed) chat turn on connection open; byte-identical to the
/// prompt deployed clients were tuned against, typos included.
const OPS_PRIMER: &str = "you are connected to a bash terminal that runs on a Debian GNU/Linux 12 (bookworm).Everything you reply will be copy pasted to bash as is to be ran. Please don't reply with anything other than bash commands. if you don't know return echo false. You will be pasted the reply of the bash terminal as a response and if the task is done return echo true. Please make sure that all commands you send return and don't hang forver and are cli ready meaning that you cannot confirum. don't install any new packages unless asked.";

/// Classified model output. The sentinel protocol is string-exact on the
/// wire; classification happens only at this parsing boundary so the relay
/// logic works with a tagged value instead of literal comparisons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpsReply {
    /// Task finished (`"echo true"` on the wire).
    Done,
    /// Intent unknown (`"echo false"` on the wire).
    Unknown,
    /// Anything else: a command line to execute.
    Command(String),
}

impl OpsReply {
    pub fn from_wire(text: &str) -> Self {
        match text {
            SENTINEL_DONE => OpsReply::Done,
            SENTINEL_UNKNOWN => OpsReply::Unknown,
            other => OpsReply::Command(other.to_string()),
        }
    }

    pub fn as_wire(&self) -> &str {
        match self {
            OpsReply::Done => SENTINEL_DONE,
            OpsReply::Unknown => SENTINEL_UNKNOWN,
            OpsReply::Command(text) => text,
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

async fn run_connection(mut socket: WebSocket, state: Arc<AppState>) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    let mut session = ChatSession::new(state.model.as_ref());
    info!(conn_id = %conn_id, "ops session started");

    if let Err(e) = session.send(OPS_PRIMER, false).await {
        error!(conn_id, error = %e, "primer submission failed, closing connection");
        return;
    }

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
                let output = match run_turn(&mut session, state.runner.as_ref(), &frame.content).await {
                    Ok(out) => out,
                    Err(e) => {
                        error!(conn_id, error = %e, "model call failed, closing connection");
                        break;
                    }
                };

                if send::json(&mut socket, &Frame { content: output })
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

    info!(conn_id, "ops connection closed");
}

/// One operations exchange: consult the model, execute its reply, repair at
/// most once. Returns the output of whichever command actually ran last.
///
/// Sentinel inputs echo straight back without touching the model or a shell.
/// Command failures never fail the turn; only model errors propagate.
async fn run_turn<M, R>(
    session: &mut ChatSession<'_, M>,
    runner: &R,
    input: &str,
) -> Result<String, ModelError>
where
    M: GenerativeModel + ?Sized,
    R: UntrustedRunner + ?Sized,
{
    if !matches!(OpsReply::from_wire(input), OpsReply::Command(_)) {
        return Ok(input.to_string());
    }

    let reply = session.send(input, true).await?;
    info!(command = %reply, "running command");

    let failed_output = match runner.run(&reply).await {
        Ok(result) if result.success() => return Ok(result.output),
        Ok(result) => result.output,
        Err(e) => e.to_string(),
    };

    warn!(command = %reply, output = %failed_output, "command failed, requesting a fix");
    let fixed = session
        .send(
            &format!(
                "There was an error running the command. Output was: {failed_output}\nFix it."
            ),
            true,
        )
        .await?;

    info!(command = %fixed, "running corrected command");
    match runner.run(&fixed).await {
        Ok(result) => {
            if !result.success() {
                warn!(command = %fixed, output = %result.output, "corrected command also failed");
            }
            Ok(result.output)
        }
        Err(e) => {
            warn!(command = %fixed, error = %e, "corrected command failed to spawn");
            Ok(e.to_string())
        }
    }
}
