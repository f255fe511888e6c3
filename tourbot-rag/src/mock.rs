//! Scripted [`CompletionModel`] for tests and demos.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{RagError, Result};
use crate::llm::{CompletionModel, CompletionRequest};

#[derive(Debug, Clone)]
enum Reply {
    Fixed(String),
    EchoQuestion,
    Fail(String),
}

/// A completion model that answers without any network access.
///
/// Every request is recorded and can be inspected with
/// [`requests`](MockCompletionModel::requests).
#[derive(Debug)]
pub struct MockCompletionModel {
    reply: Reply,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletionModel {
    /// Always answer with `text`.
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fixed(text.into()))
    }

    /// Answer with `"Answer: {user prompt}"`.
    pub fn echo() -> Self {
        Self::with_reply(Reply::EchoQuestion)
    }

    /// Always fail with a [`RagError::Generation`] carrying `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Fail(message.into()))
    }

    fn with_reply(reply: Reply) -> Self {
        Self { reply, requests: Mutex::new(Vec::new()) }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl CompletionModel for MockCompletionModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }

        match &self.reply {
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::EchoQuestion => Ok(format!("Answer: {}", request.user_prompt)),
            Reply::Fail(message) => Err(RagError::generation(self.name(), message.clone())),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
