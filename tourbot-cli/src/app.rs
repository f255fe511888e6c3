//! Wiring of core components from resolved [`Settings`].

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use tourbot_rag::{
    AnswerGenerator, DocumentStore, EmbeddingProvider, GenerationSettings, HashingEmbeddingProvider,
    InMemoryVectorStore, NewDocument, OpenAIChatModel, OpenAIEmbeddingProvider, RagPipeline,
    Settings, StoreBackend, TextSearchStore, VectorSearchStore, VectorStore,
};
use tracing::info;

/// Documents bundled with the binary, used to seed in-process stores.
pub const SAMPLE_DOCUMENTS: &str = include_str!("../data/sample_documents.json");

/// Parse a JSON array of documents.
pub fn parse_documents(json: &str) -> anyhow::Result<Vec<NewDocument>> {
    serde_json::from_str(json)
        .context("expected a JSON array of documents with `content` and `metadata`")
}

/// Read and parse a document file.
pub fn load_documents(path: &Path) -> anyhow::Result<Vec<NewDocument>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    parse_documents(&json).with_context(|| format!("invalid document file {}", path.display()))
}

/// Whether the configured store lives only as long as the process.
pub fn is_ephemeral(settings: &Settings) -> bool {
    matches!(settings.store.backend, StoreBackend::Memory | StoreBackend::Text)
}

fn embedder(settings: &Settings, offline: bool) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    if offline {
        return Ok(Arc::new(HashingEmbeddingProvider::new(settings.rag.embedding_dimensions)));
    }
    let provider = OpenAIEmbeddingProvider::from_config(
        settings.require_api_key()?,
        &settings.openai.base_url,
        &settings.rag,
    )?;
    Ok(Arc::new(provider))
}

async fn vector_backend(
    settings: &Settings,
    dimensions: usize,
) -> anyhow::Result<Arc<dyn VectorStore>> {
    match settings.store.backend {
        StoreBackend::Pgvector => pgvector_backend(settings, dimensions).await,
        _ => Ok(Arc::new(InMemoryVectorStore::new(dimensions))),
    }
}

#[cfg(feature = "pgvector")]
async fn pgvector_backend(
    settings: &Settings,
    dimensions: usize,
) -> anyhow::Result<Arc<dyn VectorStore>> {
    let url = settings.store.database_url.as_deref().context("store.database_url is not set")?;
    let store = tourbot_rag::PgVectorStore::connect(url, &settings.store.table, dimensions).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "pgvector"))]
async fn pgvector_backend(
    _settings: &Settings,
    _dimensions: usize,
) -> anyhow::Result<Arc<dyn VectorStore>> {
    bail!("this build of tourbot has no pgvector support; rebuild with `--features pgvector`")
}

/// Create the document store selected by `store.backend`.
pub async fn build_store(
    settings: &Settings,
    offline: bool,
) -> anyhow::Result<Arc<dyn DocumentStore>> {
    if settings.store.backend == StoreBackend::Text {
        info!("using keyword text search; relevance scores are not similarity scores");
        return Ok(Arc::new(TextSearchStore::new()));
    }

    let embedder = embedder(settings, offline)?;
    let backend = vector_backend(settings, embedder.dimensions()).await?;
    info!(
        backend = backend.backend_name(),
        embedding_model = embedder.model_id(),
        dimensions = embedder.dimensions(),
        "document store ready"
    );
    Ok(Arc::new(VectorSearchStore::new(embedder, backend, settings.rag.store_timeout())))
}

/// Create the answer generator backed by the configured chat model.
pub fn build_generator(settings: &Settings) -> anyhow::Result<AnswerGenerator> {
    let model = OpenAIChatModel::from_config(
        settings.require_api_key()?,
        &settings.openai.base_url,
        &settings.rag,
    )?;
    Ok(AnswerGenerator::new(Arc::new(model), GenerationSettings::try_from(&settings.rag)?))
}

/// Create the full pipeline.
pub fn build_pipeline(
    settings: &Settings,
    store: Arc<dyn DocumentStore>,
) -> anyhow::Result<RagPipeline> {
    let pipeline = RagPipeline::builder()
        .config(settings.rag.clone())
        .store(store)
        .generator(build_generator(settings)?)
        .build()?;
    Ok(pipeline)
}

/// Insert documents one by one, returning how many were stored.
pub async fn ingest(
    store: &dyn DocumentStore,
    documents: Vec<NewDocument>,
) -> anyhow::Result<usize> {
    if documents.is_empty() {
        bail!("no documents to ingest");
    }
    let total = documents.len();
    for (index, document) in documents.into_iter().enumerate() {
        store
            .insert(document)
            .await
            .with_context(|| format!("document {} of {total} was rejected", index + 1))?;
    }
    info!(backend = store.backend_name(), document_count = total, "ingestion finished");
    Ok(total)
}
