//! End-to-end behaviour of `RagPipeline::process` with offline collaborators.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tourbot_rag::{
    AnswerGenerator, ConversationTurn, Document, DocumentMetadata, DocumentStore,
    EmbeddingProvider, GenerationSettings, HashingEmbeddingProvider, InMemoryVectorStore,
    MockCompletionModel, NO_DOCUMENTS_CONTEXT, NewDocument, PipelineOutcome, QueryResult,
    RagConfig, RagError, RagPipeline, Result, RetrievedMatch, TextSearchStore, VectorSearchStore,
    VectorStore,
};

const DIM: usize = 512;

fn corpus() -> Vec<NewDocument> {
    vec![
        NewDocument::new(
            "Living root bridges near Nongriat are grown from Ficus elastica roots.",
            DocumentMetadata::titled("Living Root Bridges").with_source("Meghalaya Tourism"),
        )
        .with_id("root-bridges"),
        NewDocument::new(
            "Cherrapunji receives some of the heaviest rainfall on earth.",
            DocumentMetadata::titled("Cherrapunji"),
        )
        .with_id("cherrapunji"),
        NewDocument::new(
            "The Nongkrem dance festival is celebrated by the Khasi people at Smit.",
            DocumentMetadata::titled("Nongkrem Festival"),
        )
        .with_id("nongkrem"),
        NewDocument::new(
            "Dawki is known for the crystal clear Umngot river.",
            DocumentMetadata::titled("Dawki"),
        )
        .with_id("dawki"),
        NewDocument::new(
            "Shillong, the capital, offers cafes, music and pine forests.",
            DocumentMetadata::titled("Shillong"),
        )
        .with_id("shillong"),
        NewDocument::new(
            "Mawsynram competes with Cherrapunji as the wettest place.",
            DocumentMetadata::titled("Mawsynram"),
        )
        .with_id("mawsynram"),
    ]
}

fn vector_store() -> Arc<VectorSearchStore> {
    let embedder = Arc::new(HashingEmbeddingProvider::new(DIM));
    let backend = Arc::new(InMemoryVectorStore::new(DIM));
    Arc::new(VectorSearchStore::new(embedder, backend, Duration::from_secs(5)))
}

fn generator(model: Arc<MockCompletionModel>) -> AnswerGenerator {
    AnswerGenerator::new(model, GenerationSettings::new("gpt-4", 0.7, 1000).unwrap())
}

fn build_pipeline(
    store: Arc<dyn DocumentStore>,
    model: Arc<MockCompletionModel>,
    top_k: usize,
) -> RagPipeline {
    RagPipeline::builder()
        .config(RagConfig::builder().top_k(top_k).build().unwrap())
        .store(store)
        .generator(generator(model))
        .build()
        .unwrap()
}

/// Always unavailable.
struct DownStore;

#[async_trait]
impl DocumentStore for DownStore {
    async fn insert(&self, _document: NewDocument) -> Result<String> {
        Err(self.outage())
    }

    async fn search(&self, _query: &str, _k: usize) -> Result<Vec<RetrievedMatch>> {
        Err(self.outage())
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<Document>> {
        Err(self.outage())
    }

    async fn count(&self) -> Result<usize> {
        Err(self.outage())
    }

    async fn ping(&self) -> Result<()> {
        Err(self.outage())
    }

    fn backend_name(&self) -> &str {
        "down"
    }
}

impl DownStore {
    fn outage(&self) -> RagError {
        RagError::StoreUnavailable {
            backend: "down".into(),
            message: "connection refused".into(),
        }
    }
}

/// Embedding service that never answers.
struct UnreachableEmbedder;

#[async_trait]
impl EmbeddingProvider for UnreachableEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding {
            provider: "test".into(),
            message: "connection refused".into(),
            transient: true,
        })
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn model_id(&self) -> &str {
        "unreachable"
    }
}

/// Backend whose searches hang for an hour.
struct StalledBackend;

#[async_trait]
impl VectorStore for StalledBackend {
    async fn upsert(&self, _documents: &[Document]) -> Result<()> {
        Ok(())
    }

    async fn search(&self, _embedding: &[f32], _top_k: usize) -> Result<Vec<RetrievedMatch>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn get(&self, _id: &str) -> Result<Option<Document>> {
        Ok(None)
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }

    fn backend_name(&self) -> &str {
        "stalled"
    }
}

/// Records every search query and finds nothing.
#[derive(Default)]
struct RecordingStore {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert(&self, _document: NewDocument) -> Result<String> {
        Ok("ignored".into())
    }

    async fn search(&self, query: &str, _k: usize) -> Result<Vec<RetrievedMatch>> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(Vec::new())
    }

    async fn get_by_id(&self, _id: &str) -> Result<Option<Document>> {
        Ok(None)
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "recording"
    }
}

#[tokio::test]
async fn living_root_bridges_ranks_first_and_is_cited() {
    let model = Arc::new(MockCompletionModel::fixed("They are made of living roots."));
    let pipeline = build_pipeline(vector_store(), model.clone(), 5);
    pipeline.ingest(corpus()).await.unwrap();

    let result = pipeline.process("Tell me about living root bridges", &[]).await;

    assert!(result.success);
    assert_eq!(result.outcome, PipelineOutcome::Completed);
    assert_eq!(result.matches[0].id, "root-bridges");
    assert!(result.matches.iter().skip(1).all(|m| m.score < result.matches[0].score));
    assert!(result.context.contains("Title: Living Root Bridges"));
    assert!(result.context.contains("Source: Meghalaya Tourism"));
    assert_eq!(result.context_length, result.context.chars().count());
    assert_eq!(result.match_count, result.matches.len());

    let requests = model.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].system_prompt.contains(&result.context));
}

#[tokio::test]
async fn top_k_two_returns_two_ranked_matches_regardless_of_insertion_order() {
    let query = "cherrapunji rainfall earth";

    let forward = build_pipeline(vector_store(), Arc::new(MockCompletionModel::echo()), 2);
    forward.ingest(corpus()).await.unwrap();
    let mut reversed_corpus = corpus();
    reversed_corpus.reverse();
    let reversed = build_pipeline(vector_store(), Arc::new(MockCompletionModel::echo()), 2);
    reversed.ingest(reversed_corpus).await.unwrap();

    let a = forward.process(query, &[]).await;
    let b = reversed.process(query, &[]).await;

    assert_eq!(a.match_count, 2);
    assert_eq!(b.match_count, 2);
    assert!(a.matches[0].score >= a.matches[1].score);
    assert_eq!(a.matches[0].id, "cherrapunji");

    let ids = |r: &QueryResult| r.matches.iter().map(|m| m.id.clone()).collect::<Vec<_>>();
    assert_eq!(ids(&a), ids(&b));
}

#[tokio::test]
async fn empty_retrieval_uses_sentinel_context() {
    let text_store = Arc::new(TextSearchStore::new());
    let pipeline = build_pipeline(text_store, Arc::new(MockCompletionModel::echo()), 5);
    pipeline.ingest(corpus()).await.unwrap();

    let result = pipeline.process("", &[]).await;
    assert_eq!(result.match_count, 0);
    assert_eq!(result.context, NO_DOCUMENTS_CONTEXT);
    assert!(result.success);
    assert_eq!(result.outcome, PipelineOutcome::Completed);

    let empty_corpus = build_pipeline(vector_store(), Arc::new(MockCompletionModel::echo()), 5);
    let result = empty_corpus.process("", &[]).await;
    assert_eq!(result.match_count, 0);
    assert_eq!(result.context, NO_DOCUMENTS_CONTEXT);
}

#[tokio::test]
async fn empty_query_against_populated_vector_store_uses_sentinel_context() {
    let pipeline = build_pipeline(vector_store(), Arc::new(MockCompletionModel::echo()), 5);
    pipeline.ingest(corpus()).await.unwrap();

    let result = pipeline.process("", &[]).await;
    assert_eq!(result.match_count, 0);
    assert!(result.matches.is_empty());
    assert_eq!(result.context, NO_DOCUMENTS_CONTEXT);
    assert_eq!(result.outcome, PipelineOutcome::Completed);
    assert!(result.retrieval_error.is_none());
}

#[tokio::test]
async fn store_outage_degrades_instead_of_failing() {
    let model = Arc::new(MockCompletionModel::fixed("General advice."));
    let pipeline = build_pipeline(Arc::new(DownStore), model, 5);

    let result = pipeline.process("Best time to visit Shillong", &[]).await;
    assert_eq!(result.outcome, PipelineOutcome::CompletedDegraded);
    assert_eq!(result.match_count, 0);
    assert_eq!(result.context, NO_DOCUMENTS_CONTEXT);
    assert_eq!(result.answer_text, "General advice.");
    assert!(result.success);
    assert!(result.retrieval_error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn query_embedding_failure_becomes_retrieval_error_and_degrades() {
    let backend = Arc::new(InMemoryVectorStore::new(DIM));
    let store = Arc::new(VectorSearchStore::new(
        Arc::new(UnreachableEmbedder),
        backend,
        Duration::from_secs(5),
    ));

    let err = store.search("Dawki river", 3).await.unwrap_err();
    assert!(matches!(&err, RagError::Retrieval(message) if message.contains("connection refused")));

    let model = Arc::new(MockCompletionModel::fixed("Dawki is in the Jaintia Hills."));
    let pipeline = build_pipeline(store, model.clone(), 3);
    let result = pipeline.process("Dawki river", &[]).await;

    assert_eq!(result.outcome, PipelineOutcome::CompletedDegraded);
    assert!(result.success);
    assert_eq!(result.match_count, 0);
    assert_eq!(result.context, NO_DOCUMENTS_CONTEXT);
    assert!(result.retrieval_error.unwrap().starts_with("Retrieval error: query embedding failed"));
    assert_eq!(model.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_backend_times_out_as_store_unavailable() {
    let store = Arc::new(VectorSearchStore::new(
        Arc::new(HashingEmbeddingProvider::new(DIM)),
        Arc::new(StalledBackend),
        Duration::from_secs(2),
    ));

    let err = store.search("Umiam lake", 3).await.unwrap_err();
    match &err {
        RagError::StoreUnavailable { backend, message } => {
            assert_eq!(backend, "stalled");
            assert!(message.contains("timed out"));
        }
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }

    let pipeline = build_pipeline(store, Arc::new(MockCompletionModel::fixed("Try Umiam.")), 3);
    let result = pipeline.process("Umiam lake", &[]).await;
    assert_eq!(result.outcome, PipelineOutcome::CompletedDegraded);
    assert_eq!(result.answer_text, "Try Umiam.");
    assert!(result.retrieval_error.unwrap().contains("Document store unavailable (stalled)"));
}

#[tokio::test]
async fn generator_failure_is_isolated() {
    let model = Arc::new(MockCompletionModel::failing("rate limit exceeded"));
    let pipeline = build_pipeline(vector_store(), model, 5);
    pipeline.ingest(corpus()).await.unwrap();

    let result = pipeline.process("Tell me about Dawki", &[]).await;
    assert!(!result.success);
    assert!(result.answer_text.starts_with("I apologize"));
    assert!(result.error_detail.as_deref().unwrap().contains("rate limit exceeded"));
    assert!(result.match_count > 0);
    assert_eq!(result.outcome, PipelineOutcome::Completed);
}

#[tokio::test]
async fn history_only_affects_retrieval_query() {
    let store = Arc::new(RecordingStore::default());
    let model = Arc::new(MockCompletionModel::echo());
    let pipeline = build_pipeline(store.clone(), model.clone(), 5);

    let history = vec![
        ConversationTurn::user("Tell me about the living root bridges"),
        ConversationTurn::assistant("They are near Nongriat.", Vec::new()),
    ];

    let result = pipeline.process("How do I get there?", &history).await;
    assert_eq!(result.answer_text, "Answer: How do I get there?");

    let queries = store.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].starts_with("Context: Recent conversation:"));
    assert!(queries[0].contains("user: Tell me about the living root bridges"));
    assert!(queries[0].ends_with("Current question: How do I get there?"));
    assert_eq!(model.requests()[0].user_prompt, "How do I get there?");

    pipeline.process("Best season for Dawki", &history).await;
    assert_eq!(store.queries.lock().unwrap()[1], "Best season for Dawki");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_are_independent() {
    let model = Arc::new(MockCompletionModel::echo());
    let pipeline = Arc::new(build_pipeline(vector_store(), model, 3));
    pipeline.ingest(corpus()).await.unwrap();

    let questions = ["Dawki river", "Nongkrem festival", "Shillong cafes", "Cherrapunji rainfall"];
    let handles: Vec<_> = (0..16)
        .map(|i| {
            let pipeline = Arc::clone(&pipeline);
            let question = questions[i % questions.len()].to_string();
            tokio::spawn(async move {
                let result = pipeline.process(&question, &[]).await;
                (question, result)
            })
        })
        .collect();

    for handle in handles {
        let (question, result) = handle.await.unwrap();
        assert!(result.success);
        assert_eq!(result.answer_text, format!("Answer: {question}"));
        assert_eq!(result.match_count, 3);
    }
}
