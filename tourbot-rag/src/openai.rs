//! OpenAI-compatible embedding and chat completion clients.
//!
//! This module is only available when the `openai` feature is enabled.
//! Both clients call the REST API directly with `reqwest`, bound every request
//! by a timeout, and retry timeouts, rate limits and 5xx responses with the
//! configured [`RetryPolicy`].

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::RagConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::llm::{CompletionModel, CompletionRequest};
use crate::retry::RetryPolicy;

/// The default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const PROVIDER: &str = "OpenAI";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared HTTP plumbing for both clients.
#[derive(Clone)]
struct ApiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    timeout: Duration,
    retry: RetryPolicy,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url.trim_end_matches('/'))
    }

    /// POST `body` to `path` and decode the JSON reply, retrying transient failures.
    ///
    /// `wrap` turns a failure message and its transient flag into the
    /// caller's error variant.
    async fn post<B, R>(&self, path: &str, body: &B, wrap: ErrorWrap) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.url(path);
        self.retry.execute(|| self.post_once(&url, body, wrap)).await
    }

    async fn post_once<B, R>(&self, url: &str, body: &B, wrap: ErrorWrap) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, url, error = %e, "request failed");
                wrap(format!("request failed: {e}"), e.is_timeout() || e.is_connect())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);

            error!(provider = PROVIDER, %status, "API error");
            let transient = status.as_u16() == 429 || status.is_server_error();
            return Err(wrap(format!("API returned {status}: {detail}"), transient));
        }

        response.json::<R>().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            wrap(format!("failed to parse response: {e}"), false)
        })
    }
}

type ErrorWrap = fn(String, bool) -> RagError;

fn embedding_error(message: String, transient: bool) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message, transient }
}

fn generation_error(message: String, transient: bool) -> RagError {
    RagError::Generation { provider: PROVIDER.into(), message, transient }
}

fn require_key(api_key: String, wrap: ErrorWrap) -> Result<String> {
    if api_key.trim().is_empty() {
        return Err(wrap("API key must not be empty".into(), false));
    }
    Ok(api_key)
}

// ── OpenAI API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Embeddings ──────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by the OpenAI embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use tourbot_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?
///     .with_model("text-embedding-3-large", 3072);
/// let embedding = provider.embed("Living Root Bridges").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProvider {
    api: ApiClient,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for `text-embedding-3-large` (3072 dimensions).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = require_key(api_key.into(), embedding_error)?;
        let defaults = RagConfig::default();
        Ok(Self {
            api: ApiClient::new(api_key),
            model: defaults.embedding_model,
            dimensions: defaults.embedding_dimensions,
        })
    }

    /// Create a provider using model, timeout and retry settings from `config`.
    pub fn from_config(
        api_key: impl Into<String>,
        base_url: &str,
        config: &RagConfig,
    ) -> Result<Self> {
        Ok(Self::new(api_key)?
            .with_base_url(base_url)
            .with_model(config.embedding_model.clone(), config.embedding_dimensions)
            .with_timeout(config.request_timeout())
            .with_retry(RetryPolicy::from(&config.retry)))
    }

    /// Set the model and its output dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.api.timeout = timeout;
        self
    }

    /// Retry policy for transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.api.retry = retry;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_batch(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| embedding_error("API returned empty response".into(), false))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
            // Only the text-embedding-3 family accepts a dimensions override.
            dimensions: self.model.starts_with("text-embedding-3").then_some(self.dimensions),
        };

        let mut response: EmbeddingResponse =
            self.api.post("embeddings", &request_body, embedding_error).await?;

        if response.data.len() != texts.len() {
            return Err(embedding_error(
                format!(
                    "API returned {} embeddings for {} inputs",
                    response.data.len(),
                    texts.len()
                ),
                false,
            ));
        }
        response.data.sort_by_key(|d| d.index);
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// ── Chat completions ────────────────────────────────────────────────

/// A [`CompletionModel`] backed by the OpenAI chat completions API.
///
/// The model id, temperature and token limit travel with each
/// [`CompletionRequest`]; the client only holds connection settings.
#[derive(Debug, Clone)]
pub struct OpenAIChatModel {
    api: ApiClient,
}

impl OpenAIChatModel {
    /// Create a client for the public OpenAI endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if `api_key` is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = require_key(api_key.into(), generation_error)?;
        Ok(Self { api: ApiClient::new(api_key) })
    }

    /// Create a client using timeout and retry settings from `config`.
    pub fn from_config(
        api_key: impl Into<String>,
        base_url: &str,
        config: &RagConfig,
    ) -> Result<Self> {
        Ok(Self::new(api_key)?
            .with_base_url(base_url)
            .with_timeout(config.request_timeout())
            .with_retry(RetryPolicy::from(&config.retry)))
    }

    /// Point at another OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.base_url = base_url.into();
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.api.timeout = timeout;
        self
    }

    /// Retry policy for transient failures.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.api.retry = retry;
        self
    }
}

#[async_trait]
impl CompletionModel for OpenAIChatModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &request.model,
            messages: [
                ChatMessage { role: "system", content: &request.system_prompt },
                ChatMessage { role: "user", content: &request.user_prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response: ChatResponse =
            self.api.post("chat/completions", &body, generation_error).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| generation_error("API returned no completion text".into(), false))
    }

    fn name(&self) -> &str {
        PROVIDER
    }
}
