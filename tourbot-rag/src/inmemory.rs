//! In-memory vector store using cosine similarity.
//!
//! This module provides [`InMemoryVectorStore`], a vector store backed by an
//! insertion-ordered map protected by a `tokio::sync::RwLock`. It is suitable
//! for development, testing, and corpora of a few thousand documents.

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::document::{Document, RetrievedMatch};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, has_direction};

/// An in-memory vector store using cosine similarity for search.
///
/// Documents are kept in insertion order (document id → document), which is
/// also the tie-break order for equal scores. Re-upserting an id replaces the
/// document in place. All operations are async-safe via `tokio::sync::RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use tourbot_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new(384);
/// store.upsert(&documents).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimensions: usize,
    documents: RwLock<IndexMap<String, Document>>,
}

impl InMemoryVectorStore {
    /// Create a new empty store expecting embeddings of `dimensions` length.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, documents: RwLock::new(IndexMap::new()) }
    }

    /// Expected embedding dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, documents: &[Document]) -> Result<()> {
        if let Some(bad) = documents.iter().find(|d| d.embedding.len() != self.dimensions) {
            return Err(RagError::Validation(format!(
                "document '{}' has embedding dimension {}, expected {}",
                bad.id,
                bad.embedding.len(),
                self.dimensions
            )));
        }
        let mut store = self.documents.write().await;
        for document in documents {
            store.insert(document.id.clone(), document.clone());
        }
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedMatch>> {
        if embedding.len() != self.dimensions {
            return Err(RagError::Retrieval(format!(
                "query embedding has dimension {}, expected {}",
                embedding.len(),
                self.dimensions
            )));
        }

        if !has_direction(embedding) {
            return Ok(Vec::new());
        }

        let store = self.documents.read().await;
        let mut scored: Vec<RetrievedMatch> = store
            .values()
            .filter(|document| document.embedding.len() == self.dimensions)
            .map(|document| {
                RetrievedMatch::from_document(
                    document,
                    cosine_similarity(&document.embedding, embedding),
                )
            })
            .collect();

        // `sort_by` is stable, so equal scores keep insertion order.
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn get(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.read().await.len())
    }

    fn backend_name(&self) -> &str {
        "InMemory"
    }
}
