//! RAG pipeline orchestrator.
//!
//! The [`RagPipeline`] answers one question per [`process`](RagPipeline::process)
//! call by composing a [`DocumentStore`], a [`ContextFormatter`] and an
//! [`AnswerGenerator`]:
//!
//! ```text
//! RECEIVED -> RETRIEVING -> FORMATTING -> GENERATING -> COMPLETED
//!                  |                                   \-> COMPLETED_DEGRADED (retrieval failed)
//!                  \-> (error: continue with no matches)  \-> FAILED (generator panicked)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use tourbot_rag::{AnswerGenerator, RagConfig, RagPipeline};
//!
//! let pipeline = RagPipeline::builder()
//!     .config(RagConfig::default())
//!     .store(Arc::new(store))
//!     .generator(AnswerGenerator::new(Arc::new(model), settings))
//!     .build()?;
//!
//! let result = pipeline.process("Tell me about living root bridges", &[]).await;
//! println!("{}", result.answer_text);
//! ```

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::RagConfig;
use crate::context::ContextFormatter;
use crate::document::{NewDocument, RetrievedMatch};
use crate::error::{RagError, Result};
use crate::generator::{AnswerGenerator, GenerationResult};
use crate::history::{ConversationTurn, enhance_query};
use crate::store::{DocumentStore, preview};

/// Intermediate states of a single `process` call, used in debug logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// The query was accepted.
    Received,
    /// Searching the document store.
    Retrieving,
    /// Building the context block.
    Formatting,
    /// Waiting for the completion service.
    Generating,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Retrieving => "retrieving",
            PipelineStage::Formatting => "formatting",
            PipelineStage::Generating => "generating",
        };
        f.write_str(name)
    }
}

/// Terminal state of a `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Retrieval and generation both ran.
    Completed,
    /// Retrieval failed; the answer was generated without documents.
    CompletedDegraded,
    /// The generator panicked. Always a defect.
    Failed,
}

/// The pipeline's answer to one query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryResult {
    /// Answer for display. Never empty; an apology when generation failed.
    pub answer_text: String,
    /// Whether the answer came from the completion service.
    pub success: bool,
    /// Documents the answer was grounded on, most relevant first.
    pub matches: Vec<RetrievedMatch>,
    /// The context block sent to the model.
    pub context: String,
    /// Length of `context` in characters.
    pub context_length: usize,
    /// `matches.len()`.
    pub match_count: usize,
    /// Generation error, if any.
    pub error_detail: Option<String>,
    /// Retrieval error that caused degraded mode, if any.
    pub retrieval_error: Option<String>,
    /// Terminal state.
    pub outcome: PipelineOutcome,
    /// Wall-clock time spent in `process`.
    pub elapsed_ms: u64,
}

/// The RAG pipeline orchestrator.
///
/// Holds only shared, read-only collaborators, so one instance can serve any
/// number of concurrent `process` calls. Construct one via
/// [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    store: Arc<dyn DocumentStore>,
    generator: AnswerGenerator,
    formatter: ContextFormatter,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Return a reference to the document store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Insert documents into the store, returning their ids in input order.
    ///
    /// # Errors
    ///
    /// Stops at the first document that fails and returns its error
    /// ([`RagError::Validation`] for empty content).
    pub async fn ingest(&self, documents: Vec<NewDocument>) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(documents.len());
        for document in documents {
            let id = self.store.insert(document).await.map_err(|e| {
                error!(backend = self.store.backend_name(), error = %e, "ingestion failed");
                e
            })?;
            ids.push(id);
        }
        info!(
            backend = self.store.backend_name(),
            document_count = ids.len(),
            "ingested documents"
        );
        Ok(ids)
    }

    /// Search the store for `query` with the configured `top_k`.
    ///
    /// # Errors
    ///
    /// Returns the store's [`RagError::Retrieval`] or [`RagError::StoreUnavailable`].
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedMatch>> {
        self.store.search(query, self.config.top_k).await
    }

    /// Answer `query`, using `history` only to sharpen retrieval.
    ///
    /// Never fails: retrieval errors degrade to an empty context and
    /// generation errors produce an apology with `success == false`.
    /// Dropping the returned future cancels any in-flight upstream call.
    pub async fn process(&self, query: &str, history: &[ConversationTurn]) -> QueryResult {
        let started = Instant::now();
        debug!(
            stage = %PipelineStage::Received,
            query_len = query.len(),
            history_len = history.len()
        );

        let search_query = enhance_query(query, history);
        if search_query != query {
            debug!(enhanced_len = search_query.len(), "query enhanced with conversation history");
        }

        debug!(stage = %PipelineStage::Retrieving, top_k = self.config.top_k);
        let (matches, retrieval_error) = match self.retrieve(&search_query).await {
            Ok(matches) => (matches, None),
            Err(e) => {
                warn!(
                    backend = self.store.backend_name(),
                    error = %e,
                    "retrieval failed, continuing without documents"
                );
                (Vec::new(), Some(e.to_string()))
            }
        };

        debug!(stage = %PipelineStage::Formatting, match_count = matches.len());
        let context = self.formatter.format(&matches);

        debug!(stage = %PipelineStage::Generating, context_len = context.len());
        let (generation, panicked) =
            match AssertUnwindSafe(self.generator.generate(query, &context)).catch_unwind().await {
                Ok(generation) => (generation, false),
                Err(payload) => {
                    let detail = panic_message(payload.as_ref());
                    error!(panic = %detail, "answer generator panicked; this is a bug");
                    (GenerationResult::failure(format!("internal error: {detail}")), true)
                }
            };

        let outcome = if panicked {
            PipelineOutcome::Failed
        } else if retrieval_error.is_some() {
            PipelineOutcome::CompletedDegraded
        } else {
            PipelineOutcome::Completed
        };
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            query_preview = %preview(query),
            elapsed_ms,
            match_count = matches.len(),
            success = generation.success,
            outcome = ?outcome,
            "query processed"
        );

        QueryResult {
            answer_text: generation.text,
            success: generation.success,
            match_count: matches.len(),
            matches,
            context_length: context.chars().count(),
            context,
            error_detail: generation.error,
            retrieval_error,
            outcome,
            elapsed_ms,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// `store` and `generator` are required; `config` defaults to
/// [`RagConfig::default()`]. Call [`build()`](RagPipelineBuilder::build)
/// to validate and produce the pipeline.
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    store: Option<Arc<dyn DocumentStore>>,
    generator: Option<AnswerGenerator>,
    formatter: ContextFormatter,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the document store.
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the answer generator.
    pub fn generator(mut self, generator: AnswerGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Set the context formatter.
    pub fn formatter(mut self, formatter: ContextFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    /// Build the [`RagPipeline`], validating the configuration and that all
    /// required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if a required field is missing or
    /// the configuration is out of range.
    pub fn build(self) -> Result<RagPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let store =
            self.store.ok_or_else(|| RagError::Configuration("store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::Configuration("generator is required".to_string()))?;

        Ok(RagPipeline { config, store, generator, formatter: self.formatter })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerationSettings;
    use crate::llm::{CompletionModel, CompletionRequest};
    use crate::store::TextSearchStore;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl CompletionModel for Echo {
        async fn complete(&self, request: &CompletionRequest) -> Result<String> {
            Ok(format!("answer to {}", request.user_prompt))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct Panicking;

    #[async_trait]
    impl CompletionModel for Panicking {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            panic!("model exploded")
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    fn generator(model: Arc<dyn CompletionModel>) -> AnswerGenerator {
        AnswerGenerator::new(model, GenerationSettings::new("gpt-4", 0.7, 1000).unwrap())
    }

    #[test]
    fn builder_requires_store_and_generator() {
        let err = RagPipeline::builder().generator(generator(Arc::new(Echo))).build();
        assert!(matches!(err, Err(RagError::Configuration(msg)) if msg.contains("store")));

        let err = RagPipeline::builder().store(Arc::new(TextSearchStore::new())).build();
        assert!(matches!(err, Err(RagError::Configuration(msg)) if msg.contains("generator")));
    }

    #[test]
    fn builder_validates_config() {
        let mut config = RagConfig::default();
        config.top_k = 0;
        let err = RagPipeline::builder()
            .config(config)
            .store(Arc::new(TextSearchStore::new()))
            .generator(generator(Arc::new(Echo)))
            .build();
        assert!(matches!(err, Err(RagError::Configuration(_))));
    }

    #[tokio::test]
    async fn generator_panic_is_contained() {
        let pipeline = RagPipeline::builder()
            .store(Arc::new(TextSearchStore::new()))
            .generator(generator(Arc::new(Panicking)))
            .build()
            .unwrap();

        let result = pipeline.process("Where is Mawlynnong?", &[]).await;
        assert_eq!(result.outcome, PipelineOutcome::Failed);
        assert!(!result.success);
        assert!(result.answer_text.starts_with("I apologize"));
        assert!(result.error_detail.unwrap().contains("model exploded"));
    }

    #[tokio::test]
    async fn context_length_counts_characters() {
        let pipeline = RagPipeline::builder()
            .store(Arc::new(TextSearchStore::new()))
            .generator(generator(Arc::new(Echo)))
            .build()
            .unwrap();
        pipeline
            .ingest(vec![NewDocument::new(
                "Nohkalikai Falls – the tallest plunge waterfall in India, near Sohra’s plateau.",
                Default::default(),
            )])
            .await
            .unwrap();

        let result = pipeline.process("Nohkalikai falls", &[]).await;
        assert_eq!(result.match_count, 1);
        assert_eq!(result.context_length, result.context.chars().count());
        assert!(result.context_length < result.context.len());
    }

    #[tokio::test]
    async fn ingest_returns_ids_and_stops_on_invalid() {
        let pipeline = RagPipeline::builder()
            .store(Arc::new(TextSearchStore::new()))
            .generator(generator(Arc::new(Echo)))
            .build()
            .unwrap();

        let ids = pipeline
            .ingest(vec![
                NewDocument::new("Umiam Lake", Default::default()).with_id("umiam"),
                NewDocument::new("Elephant Falls", Default::default()),
            ])
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], "umiam");

        let err = pipeline.ingest(vec![NewDocument::default()]).await;
        assert!(matches!(err, Err(RagError::Validation(_))));
        assert_eq!(pipeline.store().count().await.unwrap(), 2);
    }
}
