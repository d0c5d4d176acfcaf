//! Line-oriented terminal client: each stdin line becomes one frame, each
//! gateway frame is printed as it arrives.

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

const DEFAULT_URL: &str = "ws://127.0.0.1:8080/ops";

/// Same wire shape the gateway speaks; kept local so the binary has no
/// dependency on the server crates.
#[derive(Debug, Serialize, Deserialize)]
struct Frame {
    content: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsgate_client=info".into()),
        )
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_URL.to_string());

    let (stream, _) = connect_async(&url)
        .await
        .with_context(|| format!("failed to connect to {url}"))?;
    println!("connected to {url}");

    let (mut write, mut read) = stream.split();

    let reader = tokio::spawn(async move {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => match serde_json::from_str::<Frame>(&text) {
                    Ok(frame) => println!("AI: {}", frame.content),
                    Err(e) => warn!(error = %e, "unparseable frame from gateway"),
                },
                Ok(Message::Close(_)) => {
                    println!("connection closed by gateway");
                    break;
                }
                Ok(other) => debug!(?other, "ignoring non-text message"),
                Err(e) => {
                    warn!(error = %e, "read failed");
                    break;
                }
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let frame = Frame { content: line };
        let json = serde_json::to_string(&frame)?;
        if write.send(Message::Text(json.into())).await.is_err() {
            warn!("write failed, exiting");
            break;
        }
    }

    reader.abort();
    Ok(())
}
