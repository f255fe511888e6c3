//! Document stores: the query-facing search contract and its variants.
//!
//! A [`DocumentStore`] takes the raw query text. Two variants exist:
//!
//! - [`VectorSearchStore`] embeds the query and ranks by cosine similarity
//!   through any [`VectorStore`] backend. This is the normal mode.
//! - [`TextSearchStore`] ranks by keyword coverage without any embedding
//!   service. Its scores live on a different scale and must not be compared
//!   with vector scores.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{Document, NewDocument, RetrievedMatch};
use crate::embedding::{EmbeddingProvider, tokenize};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// Persistent holder of documents with top-k search by query text.
///
/// `search` never mutates the store, so concurrent queries need no coordination.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Validate, embed (if applicable) and persist a document. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the content is empty or the
    /// embedding has the wrong dimensionality.
    async fn insert(&self, document: NewDocument) -> Result<String>;

    /// Return at most `k` matches for `query`, ordered by descending score.
    ///
    /// An empty query is valid. If `k` exceeds the corpus size every
    /// searchable document is returned.
    ///
    /// # Errors
    ///
    /// - [`RagError::Validation`] if `k == 0`
    /// - [`RagError::Retrieval`] if the query cannot be embedded
    /// - [`RagError::StoreUnavailable`] if the backend fails or times out
    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>>;

    /// Fetch a document by id; absent ids yield `Ok(None)`.
    async fn get_by_id(&self, id: &str) -> Result<Option<Document>>;

    /// Number of stored documents.
    async fn count(&self) -> Result<usize>;

    /// Check that the backing storage is reachable.
    async fn ping(&self) -> Result<()>;

    /// Short name for logs (`InMemory`, `pgvector`, `text`).
    fn backend_name(&self) -> &str;
}

fn check_k(k: usize) -> Result<()> {
    if k == 0 {
        return Err(RagError::Validation("k must be at least 1".to_string()));
    }
    Ok(())
}

fn check_content(document: &NewDocument) -> Result<()> {
    if document.content.trim().is_empty() {
        return Err(RagError::Validation("document content must not be empty".to_string()));
    }
    Ok(())
}

/// Vector similarity search over a [`VectorStore`] backend.
///
/// Every backend call is bounded by `store_timeout`; a timeout is reported as
/// [`RagError::StoreUnavailable`]. Embedding failures on the query path are
/// reported as [`RagError::Retrieval`].
pub struct VectorSearchStore {
    embedder: Arc<dyn EmbeddingProvider>,
    backend: Arc<dyn VectorStore>,
    store_timeout: Duration,
}

impl VectorSearchStore {
    /// Compose an embedding provider with a vector backend.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn VectorStore>,
        store_timeout: Duration,
    ) -> Self {
        Self { embedder, backend, store_timeout }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RagError::StoreUnavailable {
                backend: self.backend.backend_name().to_string(),
                message: format!("timed out after {:?}", self.store_timeout),
            }),
        }
    }
}

#[async_trait]
impl DocumentStore for VectorSearchStore {
    async fn insert(&self, document: NewDocument) -> Result<String> {
        check_content(&document)?;

        let embedding = self.embedder.embed(&document.content).await?;
        let expected = self.embedder.dimensions();
        if embedding.len() != expected {
            return Err(RagError::Validation(format!(
                "embedding has dimension {}, expected {expected}",
                embedding.len()
            )));
        }

        let document = document.into_document(embedding);
        let id = document.id.clone();
        self.bounded(self.backend.upsert(std::slice::from_ref(&document))).await?;
        debug!(document.id = %id, backend = self.backend.backend_name(), "inserted document");
        Ok(id)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>> {
        check_k(k)?;

        let query_embedding = self.embedder.embed(query).await.map_err(|e| {
            error!(error = %e, "embedding failed during search");
            RagError::Retrieval(format!("query embedding failed: {e}"))
        })?;

        let matches = self.bounded(self.backend.search(&query_embedding, k)).await.map_err(|e| {
            error!(backend = self.backend.backend_name(), error = %e, "vector search failed");
            e
        })?;

        info!(
            query_preview = %preview(query),
            match_count = matches.len(),
            "vector search completed"
        );
        Ok(matches)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>> {
        self.bounded(self.backend.get(id)).await
    }

    async fn count(&self) -> Result<usize> {
        self.bounded(self.backend.count()).await
    }

    async fn ping(&self) -> Result<()> {
        self.bounded(self.backend.ping()).await
    }

    fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }
}

/// Keyword search over documents held in memory.
///
/// The score of a document is the fraction of distinct query terms that
/// occur in its title, tags or content, so it lies in `[0, 1]`. Documents sharing no
/// term with the query are not returned, and an empty query returns nothing.
/// No embedding service is involved, which makes this the fallback when the
/// embedding service is unavailable for a whole deployment.
#[derive(Debug, Default)]
pub struct TextSearchStore {
    documents: RwLock<IndexMap<String, Document>>,
}

impl TextSearchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn score(terms: &HashSet<String>, document: &Document) -> f32 {
        if terms.is_empty() {
            return 0.0;
        }
        let metadata = &document.metadata;
        let title = metadata.title.as_deref().unwrap_or_default();
        let words: HashSet<String> = tokenize(title)
            .chain(metadata.tags.iter().flat_map(|tag| tokenize(tag)))
            .chain(tokenize(&document.content))
            .collect();
        let hits = terms.iter().filter(|term| words.contains(*term)).count();
        hits as f32 / terms.len() as f32
    }
}

#[async_trait]
impl DocumentStore for TextSearchStore {
    async fn insert(&self, document: NewDocument) -> Result<String> {
        check_content(&document)?;
        let document = document.into_document(Vec::new());
        let id = document.id.clone();
        self.documents.write().await.insert(id.clone(), document);
        Ok(id)
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedMatch>> {
        check_k(k)?;
        let terms: HashSet<String> = tokenize(query).collect();

        let documents = self.documents.read().await;
        let mut scored: Vec<RetrievedMatch> = documents
            .values()
            .filter_map(|document| {
                let score = Self::score(&terms, document);
                (score > 0.0).then(|| RetrievedMatch::from_document(document, score))
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        info!(
            query_preview = %preview(query),
            match_count = scored.len(),
            "text search completed"
        );
        Ok(scored)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().await.get(id).cloned())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.documents.read().await.len())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "text"
    }
}

/// First 50 characters of a query, for log lines.
pub(crate) fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentMetadata;
    use crate::embedding::HashingEmbeddingProvider;
    use crate::inmemory::InMemoryVectorStore;

    fn vector_store() -> VectorSearchStore {
        let embedder = Arc::new(HashingEmbeddingProvider::new(128));
        let backend = Arc::new(InMemoryVectorStore::new(128));
        VectorSearchStore::new(embedder, backend, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn insert_rejects_empty_content() {
        let store = vector_store();
        let err = store.insert(NewDocument::new("   ", DocumentMetadata::default())).await;
        assert!(matches!(err, Err(RagError::Validation(_))));

        let err = TextSearchStore::new().insert(NewDocument::default()).await;
        assert!(matches!(err, Err(RagError::Validation(_))));
    }

    #[tokio::test]
    async fn zero_k_is_rejected() {
        let store = vector_store();
        assert!(matches!(store.search("falls", 0).await, Err(RagError::Validation(_))));
    }

    #[tokio::test]
    async fn empty_query_matches_nothing() {
        let store = vector_store();
        for content in ["Shillong peak view", "Umiam lake boating"] {
            store.insert(NewDocument::new(content, DocumentMetadata::default())).await.unwrap();
        }
        assert!(store.search("", 5).await.unwrap().is_empty());
        assert!(store.search("?!", 5).await.unwrap().is_empty());
        assert_eq!(store.search("umiam", 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn text_search_matches_tags() {
        let store = TextSearchStore::new();
        let metadata = DocumentMetadata {
            title: Some("Mawsmai Cave".into()),
            tags: vec!["caving".into(), "adventure".into()],
            ..Default::default()
        };
        store
            .insert(NewDocument::new("A limestone cave near Sohra.", metadata).with_id("mawsmai"))
            .await
            .unwrap();
        store
            .insert(NewDocument::new("Boating on Umiam lake.", DocumentMetadata::default()))
            .await
            .unwrap();

        let results = store.search("caving adventure", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "mawsmai");
        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn get_by_id_round_trip() {
        let store = vector_store();
        let id = store
            .insert(
                NewDocument::new("Dawki river", DocumentMetadata::titled("Dawki")).with_id("dawki"),
            )
            .await
            .unwrap();
        assert_eq!(id, "dawki");

        let document = store.get_by_id("dawki").await.unwrap().unwrap();
        assert_eq!(document.metadata.title.as_deref(), Some("Dawki"));
        assert_eq!(document.embedding.len(), 128);
        assert!(store.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn text_search_scores_term_coverage() {
        let store = TextSearchStore::new();
        store
            .insert(NewDocument::new(
                "Bridges grown from Ficus elastica roots near Nongriat.",
                DocumentMetadata::titled("Living Root Bridges"),
            ))
            .await
            .unwrap();
        store
            .insert(NewDocument::new(
                "A crystal clear river at Dawki.",
                DocumentMetadata::default(),
            ))
            .await
            .unwrap();
        store
            .insert(NewDocument::new("Root vegetables at the market.", DocumentMetadata::default()))
            .await
            .unwrap();

        let results = store.search("living root bridges", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metadata.title.as_deref(), Some("Living Root Bridges"));
        assert!((results[0].score - 1.0).abs() < f32::EPSILON);
        assert!((results[1].score - 1.0 / 3.0).abs() < 1e-6);

        assert!(store.search("", 3).await.unwrap().is_empty());
    }
}
