//! Scripted in-process stand-ins for the model and the runner, shared by the
//! turn-logic tests and the connection-loop tests.

use async_trait::async_trait;
use opsgate_exec::{ExecError, ExecResult, UntrustedRunner};
use opsgate_model::stream::StreamEvent;
use opsgate_model::{GenerateResponse, GenerativeModel, ModelError, Turn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Fake model that pops one canned reply text per call and counts calls.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next(&self) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
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
        Ok(GenerateResponse::from_parts(&[&self.next()]))
    }

    async fn generate_stream(
        &self,
        _contents: &[Turn],
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ModelError> {
        let _ = tx
            .send(StreamEvent::TextDelta { text: self.next() })
            .await;
        let _ = tx.send(StreamEvent::Done).await;
        Ok(())
    }
}

/// Fake runner that pops one canned execution result per call and counts
/// calls.
pub struct ScriptedRunner {
    results: Mutex<VecDeque<Result<ExecResult, ExecError>>>,
    calls: AtomicUsize,
}

impl ScriptedRunner {
    pub fn returning(results: Vec<Result<ExecResult, ExecError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UntrustedRunner for ScriptedRunner {
    async fn run(&self, _command: &str) -> Result<ExecResult, ExecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted runner ran out of results")
    }
}
