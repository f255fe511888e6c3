//! Vector store trait for storing and searching document embeddings.

use async_trait::async_trait;

use crate::document::{Document, RetrievedMatch};
use crate::error::Result;

/// A storage backend for embedded documents with similarity search.
///
/// This is the raw persistence layer; query embedding, input validation and
/// timeouts live in [`VectorSearchStore`](crate::VectorSearchStore).
///
/// # Example
///
/// ```rust,ignore
/// use tourbot_rag::{VectorStore, InMemoryVectorStore};
///
/// let store = InMemoryVectorStore::new(3072);
/// store.upsert(&documents).await?;
/// let results = store.search(&query_embedding, 5).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace documents by id. Documents must carry embeddings.
    async fn upsert(&self, documents: &[Document]) -> Result<()>;

    /// Search for the `top_k` documents most similar to `embedding`.
    ///
    /// Returns results ordered by descending score; equal scores keep
    /// insertion order. Documents without a usable embedding are skipped.
    /// A zero query vector has no direction and matches nothing.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievedMatch>>;

    /// Fetch a document by id. A missing id is `Ok(None)`.
    async fn get(&self, id: &str) -> Result<Option<Document>>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<()> {
        self.count().await.map(|_| ())
    }

    /// Short backend name used in logs and errors.
    fn backend_name(&self) -> &str;
}

/// Whether `embedding` has a non-zero norm, i.e. a defined cosine similarity.
pub(crate) fn has_direction(embedding: &[f32]) -> bool {
    embedding.iter().any(|x| *x != 0.0)
}
