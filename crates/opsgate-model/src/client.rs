//! Gemini generateContent client.
//!
//! One `GeminiClient` is shared by all connections; it holds no conversation
//! state, so concurrent independent use is safe. Conversation state lives in
//! `ChatSession`, which is connection-local.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::stream::{parse_sse_data, StreamEvent};
use crate::types::{GenerateResponse, Turn};

/// Seam between the relay loops and the remote API. The gateway talks to the
/// model exclusively through this trait, so tests can substitute a scripted
/// fake.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// One-shot generation over the given contents; returns the full response.
    async fn generate(&self, contents: &[Turn]) -> Result<GenerateResponse, ModelError>;

    /// Streamed generation; emits `TextDelta` events followed by `Done` on
    /// the channel. Callers that only want the side effect of a completed
    /// exchange drain the channel and discard the deltas.
    async fn generate_stream(
        &self,
        contents: &[Turn],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ModelError>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            model,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, self.model, method)
    }

    fn build_body(&self, contents: &[Turn]) -> serde_json::Value {
        let contents: Vec<serde_json::Value> = contents
            .iter()
            .map(|turn| {
                serde_json::json!({
                    "role": turn.role,
                    "parts": turn.parts.iter()
                        .map(|text| serde_json::json!({ "text": text }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();

        // Harassment and dangerous-content thresholds are relaxed: the
        // operations endpoint expects raw shell commands the default filters
        // would otherwise block.
        serde_json::json!({
            "contents": contents,
            "safetySettings": [
                { "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": "BLOCK_NONE" },
                { "category": "HARM_CATEGORY_HARASSMENT", "threshold": "BLOCK_NONE" },
            ],
        })
    }

    async fn post(&self, url: &str, body: &serde_json::Value) -> Result<reqwest::Response, ModelError> {
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "Gemini API error");
            return Err(ModelError::Api {
                status,
                message: text,
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    async fn generate(&self, contents: &[Turn]) -> Result<GenerateResponse, ModelError> {
        let url = self.endpoint("generateContent");
        let body = self.build_body(contents);

        debug!(model = %self.model, turns = contents.len(), "sending generateContent request");

        let resp = self.post(&url, &body).await?;
        resp.json::<GenerateResponse>()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))
    }

    async fn generate_stream(
        &self,
        contents: &[Turn],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ModelError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let body = self.build_body(contents);

        debug!(model = %self.model, turns = contents.len(), "sending streamGenerateContent request");

        let resp = self.post(&url, &body).await?;
        process_sse_stream(resp, tx).await;
        Ok(())
    }
}

/// Drain an `alt=sse` response body. Each `data:` line carries a
/// `GenerateResponse` chunk whose first candidate holds the text delta.
async fn process_sse_stream(resp: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    use futures_util::StreamExt;

    let mut line_buf = String::new();
    let mut byte_stream = resp.bytes_stream();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        let text = match std::str::from_utf8(&chunk) {
            Ok(t) => t,
            Err(_) => continue,
        };

        line_buf.push_str(text);
        let lines: Vec<&str> = line_buf.split('\n').collect();
        let (complete, remainder) = lines.split_at(lines.len() - 1);
        let remainder = remainder.first().unwrap_or(&"").to_string();

        for line in complete {
            let line = line.trim();
            let Some(data) = parse_sse_data(line) else {
                continue;
            };

            match serde_json::from_str::<GenerateResponse>(data) {
                Ok(chunk_resp) => {
                    let delta: String = chunk_resp
                        .candidates
                        .first()
                        .and_then(|c| c.content.as_ref())
                        .map(|content| {
                            content
                                .parts
                                .iter()
                                .filter_map(|p| p.text.as_deref())
                                .collect()
                        })
                        .unwrap_or_default();
                    if !delta.is_empty() {
                        debug!(len = delta.len(), "stream text delta");
                        if tx.send(StreamEvent::TextDelta { text: delta }).await.is_err() {
                            return; // receiver dropped
                        }
                    }
                }
                Err(e) => {
                    warn!(line, err = %e, "failed to parse stream chunk");
                }
            }
        }

        line_buf = remainder;
    }

    let _ = tx.send(StreamEvent::Done).await;
}
