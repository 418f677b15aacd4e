//! Scripted provider for exercising retry and pipeline logic without a network.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::provider::{LlmError, LlmProvider, Message};

/// Returns queued results in order. Once the queue is empty every call
/// succeeds with `processed: <last message content>`.
pub struct MockProvider {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful completion.
    pub fn queue_ok(&self, text: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue a failed attempt.
    pub fn queue_err(&self, error: LlmError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Queue `n` HTTP 503 failures.
    pub fn queue_unavailable(&self, n: usize) {
        for _ in 0..n {
            self.queue_err(LlmError::ApiError {
                status: 503,
                body: "service unavailable".into(),
            });
        }
    }

    /// Message lists received so far, one per attempt.
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or("");
        Ok(format!("processed: {last}"))
    }

    fn host(&self) -> &str {
        "mock.local"
    }
}
