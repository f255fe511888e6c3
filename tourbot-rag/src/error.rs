//! Error types for the `tourbot-rag` crate.

use thiserror::Error;

/// Errors that can occur in retrieval and generation.
///
/// Per-query errors are recovered inside [`RagPipeline`](crate::RagPipeline);
/// only [`RagError::Configuration`] is expected to reach the operator.
#[derive(Debug, Error)]
pub enum RagError {
    /// A missing or invalid setting. Fatal at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The embedding service was unreachable, rate limited, or returned a bad payload.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether a retry of the same call may succeed.
        transient: bool,
    },

    /// Similarity search could not run (usually because the query could not be embedded).
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The storage backend was unreachable or timed out.
    #[error("Document store unavailable ({backend}): {message}")]
    StoreUnavailable {
        /// The storage backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The completion service failed to produce an answer.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The completion provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
        /// Whether a retry of the same call may succeed.
        transient: bool,
    },

    /// Rejected input on the ingestion path (empty content, wrong dimensionality, `k == 0`).
    #[error("Validation error: {0}")]
    Validation(String),
}

impl RagError {
    /// A permanent generation failure.
    pub fn generation(provider: impl Into<String>, message: impl Into<String>) -> Self {
        let (provider, message) = (provider.into(), message.into());
        RagError::Generation { provider, message, transient: false }
    }

    /// Whether a retry of the same upstream call may succeed.
    ///
    /// Upstream clients set `transient` for timeouts, rate limits and 5xx
    /// responses. An unavailable store is always considered transient.
    pub fn is_transient(&self) -> bool {
        match self {
            RagError::Embedding { transient, .. } | RagError::Generation { transient, .. } => {
                *transient
            }
            RagError::StoreUnavailable { .. } => true,
            _ => false,
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
