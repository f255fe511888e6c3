//! # tourbot-rag
//!
//! Retrieval-augmented answering for the Meghalaya tourism assistant.
//!
//! ## Overview
//!
//! A question goes through four steps:
//!
//! 1. [`enhance_query`] optionally prefixes the question with a summary of the
//!    recent conversation, for retrieval only.
//! 2. A [`DocumentStore`] returns the top-k most relevant documents.
//! 3. [`ContextFormatter`] turns them into a numbered context block.
//! 4. [`AnswerGenerator`] asks a [`CompletionModel`] for an answer under a
//!    fixed tourism-guide persona.
//!
//! [`RagPipeline::process`] runs the whole sequence and never fails: store
//! outages degrade to an empty context and generation failures produce an
//! apology flagged with `success == false`.
//!
//! ## Stores
//!
//! - [`VectorSearchStore`] embeds queries with an [`EmbeddingProvider`] and
//!   searches a [`VectorStore`] backend ([`InMemoryVectorStore`], or
//!   `PgVectorStore` with the `pgvector` feature).
//! - [`TextSearchStore`] ranks by keyword coverage with no embedding service.
//!
//! ## Features
//!
//! - `openai`: OpenAI-compatible embedding and chat completion clients
//! - `pgvector`: PostgreSQL + pgvector backend
//! - `full`: all of the above
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tourbot_rag::*;
//!
//! let embedder = Arc::new(HashingEmbeddingProvider::default());
//! let backend = Arc::new(InMemoryVectorStore::new(embedder.dimensions()));
//! let store = Arc::new(VectorSearchStore::new(embedder, backend, Duration::from_secs(10)));
//!
//! let generator = AnswerGenerator::new(
//!     Arc::new(MockCompletionModel::echo()),
//!     GenerationSettings::new("gpt-4", 0.7, 1000)?,
//! );
//! let pipeline = RagPipeline::builder().store(store).generator(generator).build()?;
//!
//! let result = pipeline.process("Where are the living root bridges?", &[]).await;
//! ```

pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod history;
pub mod inmemory;
pub mod llm;
pub mod mock;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "pgvector")]
pub mod pgvector;
pub mod pipeline;
pub mod retry;
pub mod settings;
pub mod store;
pub mod vectorstore;

pub use config::{MAX_TOP_K, RagConfig, RagConfigBuilder, RetryConfig};
pub use context::{ContextFormatter, NO_DOCUMENTS_CONTEXT};
pub use document::{Document, DocumentMetadata, NewDocument, RetrievedMatch};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use generator::{AnswerGenerator, GenerationResult, GenerationSettings, PERSONA_TEMPLATE};
pub use history::{ConversationTurn, Role, enhance_query, summarize_recent};
pub use inmemory::InMemoryVectorStore;
pub use llm::{CompletionModel, CompletionRequest};
pub use mock::MockCompletionModel;
#[cfg(feature = "openai")]
pub use openai::{OpenAIChatModel, OpenAIEmbeddingProvider};
#[cfg(feature = "pgvector")]
pub use pgvector::PgVectorStore;
pub use pipeline::{PipelineOutcome, PipelineStage, QueryResult, RagPipeline, RagPipelineBuilder};
pub use retry::RetryPolicy;
pub use settings::{
    LogFormat, LoggingSettings, OpenAISettings, Settings, StoreBackend, StoreSettings,
};
pub use store::{DocumentStore, TextSearchStore, VectorSearchStore};
pub use vectorstore::VectorStore;
