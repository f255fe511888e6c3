//! Completion model trait for chat-style text generation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One system + user prompt pair with sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionRequest {
    /// Instructions, including any injected context.
    pub system_prompt: String,
    /// The end user's message.
    pub user_prompt: String,
    /// Model id.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Completion length limit.
    pub max_tokens: u32,
}

/// A text completion service.
///
/// Implementations wrap a specific backend (OpenAI-compatible APIs, local
/// servers, test doubles) behind a single async call.
///
/// # Example
///
/// ```rust,ignore
/// use tourbot_rag::{CompletionModel, CompletionRequest};
///
/// let text = model.complete(&request).await?;
/// ```
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Produce the assistant reply for `request`.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Provider name used in logs and errors.
    fn name(&self) -> &str;
}
