//! Property tests for in-memory vector store search ordering.

use indexmap::IndexMap;
use proptest::prelude::*;
use tourbot_rag::document::{Document, DocumentMetadata};
use tourbot_rag::inmemory::InMemoryVectorStore;
use tourbot_rag::vectorstore::VectorStore;

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a document with a normalized embedding.
fn arb_document(dim: usize) -> impl Strategy<Value = Document> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim)).prop_map(
        |(id, content, embedding)| Document {
            id,
            content,
            metadata: DocumentMetadata::default(),
            embedding,
        },
    )
}

/// Keep the first document for every id, in generation order.
fn dedup(documents: Vec<Document>) -> Vec<Document> {
    let mut unique: IndexMap<String, Document> = IndexMap::new();
    for document in documents {
        unique.entry(document.id.clone()).or_insert(document);
    }
    unique.into_values().collect()
}

/// Results are ordered by descending cosine similarity and the result count
/// is exactly `min(top_k, corpus size)`.
mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            documents in proptest::collection::vec(arb_document(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let unique = dedup(documents);
            let unique_count = unique.len();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new(DIM);
                store.upsert(&unique).await.unwrap();
                store.search(&query, top_k).await.unwrap()
            });

            prop_assert_eq!(results.len(), top_k.min(unique_count));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }

        #[test]
        fn equal_scores_keep_insertion_order(
            ids in proptest::collection::hash_set("[a-z]{4,8}", 2..10),
            embedding in arb_normalized_embedding(DIM),
        ) {
            let ids: Vec<String> = ids.into_iter().collect();
            let documents: Vec<Document> = ids
                .iter()
                .map(|id| Document {
                    id: id.clone(),
                    content: format!("copy {id}"),
                    metadata: DocumentMetadata::default(),
                    embedding: embedding.clone(),
                })
                .collect();

            let rt = tokio::runtime::Runtime::new().unwrap();
            let results = rt.block_on(async {
                let store = InMemoryVectorStore::new(DIM);
                store.upsert(&documents).await.unwrap();
                store.search(&embedding, ids.len()).await.unwrap()
            });

            let returned: Vec<String> = results.into_iter().map(|m| m.id).collect();
            prop_assert_eq!(returned, ids);
        }
    }
}
