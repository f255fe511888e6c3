//! Configuration for the retrieval and generation pipeline.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Largest accepted `top_k`.
pub const MAX_TOP_K: usize = 20;

/// Retry settings for transient upstream failures (embedding and completion calls).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_retries: 2, initial_backoff_ms: 500, max_backoff_ms: 8_000 }
    }
}

/// Configuration parameters for the RAG pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Embedding model id.
    pub embedding_model: String,
    /// Dimensionality produced by `embedding_model`.
    pub embedding_dimensions: usize,
    /// Chat completion model id.
    pub generation_model: String,
    /// Number of documents retrieved per query.
    pub top_k: usize,
    /// Sampling temperature, in `[0, 2]`.
    pub temperature: f32,
    /// Completion length limit.
    pub max_tokens: u32,
    /// Timeout for a single embedding or completion request, in seconds.
    pub request_timeout_secs: u64,
    /// Timeout for a single document store call, in seconds.
    pub store_timeout_secs: u64,
    /// Retry policy for upstream calls.
    pub retry: RetryConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimensions: 3072,
            generation_model: "gpt-4".to_string(),
            top_k: 5,
            temperature: 0.7,
            max_tokens: 1000,
            request_timeout_secs: 30,
            store_timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Timeout applied to embedding and completion requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout applied to document store calls.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Check every parameter against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.embedding_model.trim().is_empty() {
            return Err(RagError::Configuration("embedding_model must not be empty".to_string()));
        }
        if self.generation_model.trim().is_empty() {
            return Err(RagError::Configuration("generation_model must not be empty".to_string()));
        }
        if self.embedding_dimensions == 0 {
            return Err(RagError::Configuration(
                "embedding_dimensions must be greater than zero".to_string(),
            ));
        }
        if !(1..=MAX_TOP_K).contains(&self.top_k) {
            return Err(RagError::Configuration(format!(
                "top_k ({}) must be between 1 and {MAX_TOP_K}",
                self.top_k
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(RagError::Configuration(format!(
                "temperature ({}) must be between 0 and 2",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(RagError::Configuration("max_tokens must be greater than zero".to_string()));
        }
        if self.request_timeout_secs == 0 || self.store_timeout_secs == 0 {
            return Err(RagError::Configuration("timeouts must be greater than zero".to_string()));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(RagError::Configuration(format!(
                "retry.initial_backoff_ms ({}) must not exceed retry.max_backoff_ms ({})",
                self.retry.initial_backoff_ms, self.retry.max_backoff_ms
            )));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the embedding model id and its output dimensionality.
    pub fn embedding_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.config.embedding_model = model.into();
        self.config.embedding_dimensions = dimensions;
        self
    }

    /// Set the chat completion model id.
    pub fn generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    /// Set the number of documents retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the completion length limit.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the upstream request timeout in seconds.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Set the document store timeout in seconds.
    pub fn store_timeout_secs(mut self, secs: u64) -> Self {
        self.config.store_timeout_secs = secs;
        self
    }

    /// Set the retry policy for upstream calls.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are in range.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if:
    /// - `top_k` is outside `1..=20`
    /// - `temperature` is outside `[0, 2]`
    /// - `max_tokens == 0`
    /// - a model id is empty or a timeout is zero
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
