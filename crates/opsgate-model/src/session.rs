//! Connection-local chat session.
//!
//! A `ChatSession` owns the growing conversation history for exactly one
//! transport connection and is dropped with it. Each successful exchange
//! appends two turns (the submitted text and the model's reply); the history
//! is never rewritten.

use tokio::sync::mpsc;
use tracing::warn;

use crate::client::GenerativeModel;
use crate::error::ModelError;
use crate::stream::StreamEvent;
use crate::types::{Role, Turn};

pub struct ChatSession<'a, M: GenerativeModel + ?Sized> {
    model: &'a M,
    history: Vec<Turn>,
}

impl<'a, M: GenerativeModel + ?Sized> ChatSession<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            history: Vec::new(),
        }
    }

    /// Submit `text` as the next turn and return the reply text read from the
    /// last history entry.
    ///
    /// With `streamed` set, the streaming submission form is used and fully
    /// drained; intermediate deltas are discarded, the call exists only to
    /// populate the history. An empty `text` is a no-op returning `""`.
    ///
    /// On error the history is left exactly as it was.
    pub async fn send(&mut self, text: &str, streamed: bool) -> Result<String, ModelError> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let before = self.history.len();
        self.history.push(Turn::user(text));

        let model_turn = if streamed {
            match self.exchange_streamed().await {
                Ok(turn) => turn,
                Err(e) => {
                    self.history.pop();
                    return Err(e);
                }
            }
        } else {
            match self.model.generate(&self.history).await {
                Ok(resp) => {
                    let parts = resp
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|c| c.content)
                        .map(|content| {
                            content
                                .parts
                                .into_iter()
                                .filter_map(|p| p.text)
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    Turn {
                        role: Role::Model,
                        parts,
                    }
                }
                Err(e) => {
                    self.history.pop();
                    return Err(e);
                }
            }
        };

        self.history.push(model_turn);

        // Two entries, the sent message and the reply, must have been added.
        let got = self.history.len();
        let want = before + 2;
        if got != want {
            warn!(got, want, "history length mismatch");
        }

        Ok(self.last_reply())
    }

    /// Run one streamed exchange over the current history and collect the
    /// accumulated reply into a single-part model turn.
    async fn exchange_streamed(&self) -> Result<Turn, ModelError> {
        let (tx, mut rx) = mpsc::channel::<StreamEvent>(32);

        let drain = async {
            let mut text = String::new();
            let mut error: Option<String> = None;
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::TextDelta { text: delta } => text.push_str(&delta),
                    StreamEvent::Error { message } => error = Some(message),
                    StreamEvent::Done => {}
                }
            }
            (text, error)
        };

        let (sent, (text, error)) = tokio::join!(self.model.generate_stream(&self.history, tx), drain);
        sent?;
        if let Some(message) = error {
            return Err(ModelError::Stream(message));
        }

        Ok(Turn::model(text))
    }

    /// Reply text of the most recent turn, parts joined with `";"`.
    pub fn last_reply(&self) -> String {
        self.history
            .last()
            .map(|turn| turn.parts.join(";"))
            .unwrap_or_default()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GenerateResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fake model that pops one canned reply per call. `generate_stream`
    /// splits the reply into two deltas to exercise accumulation.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<GenerateResponse, ModelError>>>,
    }

    impl ScriptedModel {
        fn replying(replies: Vec<Result<GenerateResponse, ModelError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }

        fn next(&self) -> Result<GenerateResponse, ModelError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted model ran out of replies")
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        async fn generate(&self, _contents: &[Turn]) -> Result<GenerateResponse, ModelError> {
            self.next()
        }

        async fn generate_stream(
            &self,
            _contents: &[Turn],
            tx: mpsc::Sender<StreamEvent>,
        ) -> Result<(), ModelError> {
            let resp = self.next()?;
            let text = crate::render::render_response(&resp);
            let mid = text.len() / 2;
            let _ = tx
                .send(StreamEvent::TextDelta {
                    text: text[..mid].to_string(),
                })
                .await;
            let _ = tx
                .send(StreamEvent::TextDelta {
                    text: text[mid..].to_string(),
                })
                .await;
            let _ = tx.send(StreamEvent::Done).await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn history_grows_by_two_per_exchange() {
        let model = ScriptedModel::replying(vec![
            Ok(GenerateResponse::from_parts(&["first"])),
            Ok(GenerateResponse::from_parts(&["second"])),
        ]);
        let mut session = ChatSession::new(&model);

        session.send("one", false).await.unwrap();
        assert_eq!(session.history_len(), 2);

        session.send("two", false).await.unwrap();
        assert_eq!(session.history_len(), 4);
    }

    #[tokio::test]
    async fn streamed_exchange_populates_history() {
        let model = ScriptedModel::replying(vec![Ok(GenerateResponse::from_parts(&["hello"]))]);
        let mut session = ChatSession::new(&model);

        let reply = session.send("hi", true).await.unwrap();
        assert_eq!(reply, "hello");
        assert_eq!(session.history_len(), 2);
        assert_eq!(session.history()[0].role, Role::User);
        assert_eq!(session.history()[1].role, Role::Model);
    }

    #[tokio::test]
    async fn failed_call_leaves_history_unchanged() {
        let model = ScriptedModel::replying(vec![Err(ModelError::Api {
            status: 500,
            message: "boom".into(),
        })]);
        let mut session = ChatSession::new(&model);

        assert!(session.send("hi", false).await.is_err());
        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn empty_message_is_a_no_op() {
        let model = ScriptedModel::replying(vec![]);
        let mut session = ChatSession::new(&model);

        let reply = session.send("", true).await.unwrap();
        assert_eq!(reply, "");
        assert_eq!(session.history_len(), 0);
    }

    #[tokio::test]
    async fn reply_joins_parts_with_semicolon() {
        let model = ScriptedModel::replying(vec![Ok(GenerateResponse::from_parts(&["x", "y"]))]);
        let mut session = ChatSession::new(&model);

        let reply = session.send("go", false).await.unwrap();
        assert_eq!(reply, "x;y");
    }
}
