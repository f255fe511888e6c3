//! Data types for documents and retrieval results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source label used when a document carries no `source` attribute.
pub const UNKNOWN_SOURCE: &str = "Unknown source";

/// Descriptive attributes of a [`Document`].
///
/// The well-known fields have explicit fallbacks for display (see
/// [`display_title`](DocumentMetadata::display_title) and
/// [`display_source`](DocumentMetadata::display_source)). Anything else the
/// ingestion process attaches lands in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    /// Human readable title, used for citations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Provenance of the text (site, guide, brochure).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Place the document is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Coarse kind of document (`attraction`, `festival`, `cuisine`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "type")]
    pub category: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Additional attributes not covered by the fields above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentMetadata {
    /// Metadata with only a title set.
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }

    /// Set the source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Title for display, falling back to `"Document {position}"`.
    ///
    /// `position` is the 1-based position of the document in a result list.
    pub fn display_title(&self, position: usize) -> String {
        match &self.title {
            Some(title) => title.clone(),
            None => format!("Document {position}"),
        }
    }

    /// Source for display, falling back to [`UNKNOWN_SOURCE`].
    pub fn display_source(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }
}

/// A persisted unit of retrievable knowledge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier.
    pub id: String,
    /// The text body. Never empty once persisted.
    pub content: String,
    /// Descriptive attributes.
    #[serde(default)]
    pub metadata: DocumentMetadata,
    /// Embedding computed at ingestion time. Empty for stores that do not search by vector.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
}

/// Ingestion input for [`DocumentStore::insert`](crate::DocumentStore::insert).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewDocument {
    /// Optional caller supplied id; a UUID is generated when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The text body.
    pub content: String,
    /// Descriptive attributes.
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl NewDocument {
    /// Create a new document with the given content and metadata.
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self { id: None, content: content.into(), metadata }
    }

    /// Set an explicit id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub(crate) fn into_document(self, embedding: Vec<f32>) -> Document {
        Document {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            content: self.content,
            metadata: self.metadata,
            embedding,
        }
    }
}

/// A document returned by a similarity query, paired with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetrievedMatch {
    /// The id of the matched document.
    pub id: String,
    /// The document text.
    pub content: String,
    /// Metadata copied from the document.
    pub metadata: DocumentMetadata,
    /// Relevance score (higher is more relevant).
    pub score: f32,
}

impl RetrievedMatch {
    pub(crate) fn from_document(document: &Document, score: f32) -> Self {
        Self {
            id: document.id.clone(),
            content: document.content.clone(),
            metadata: document.metadata.clone(),
            score,
        }
    }
}
