//! Tests for the retrieval pipeline

use std::collections::BTreeMap;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;

use super::*;
use crate::core::types::{EmbeddingRecord, SearchQuery};
use crate::embeddings::StubEmbedder;
use crate::vector::{InMemoryBackend, VectorStore, VectorStoreConfig};

const DIM: usize = 4;

fn record(id_hint: i64, kb_id: &str, file_id: &str, embedding: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        embedding,
        image_url: format!("https://img.example/p{id_hint}.jpg"),
        image_width: 800,
        image_height: 1100,
        file_id: file_id.to_string(),
        file_name: "doc.pdf".to_string(),
        file_page: id_hint,
        file_url: String::new(),
        knowledge_base_id: kb_id.to_string(),
        extra: BTreeMap::new(),
    }
}

async fn seeded_retriever(records: Vec<EmbeddingRecord>, embedder: StubEmbedder) -> Retriever {
    let backend = Arc::new(InMemoryBackend::new());
    let config = VectorStoreConfig::default()
        .with_collection_name("kb_search")
        .with_dimension(DIM)
        .with_load_timeout(10, 5);
    let store = Arc::new(VectorStore::new(backend, config));
    store.ensure_default().await.unwrap();
    if !records.is_empty() {
        store.insert("kb_search", records).await.unwrap();
    }
    Retriever::new(store, Arc::new(embedder), SearchConfig::default())
}

// ============================================================================
// Filter expression
// ============================================================================

#[test]
fn test_filter_expression_without_file_ids() {
    let query = SearchQuery::new("sunset", "kb1");
    assert_eq!(
        Retriever::filter_expression(&query),
        "knowledge_base_id == \"kb1\""
    );
}

#[test]
fn test_filter_expression_with_file_ids() {
    let query = SearchQuery::new("sunset", "kb1")
        .with_file_ids(vec!["f1".to_string(), "f2".to_string()]);
    assert_eq!(
        Retriever::filter_expression(&query),
        "knowledge_base_id == \"kb1\" and file_id in [\"f1\", \"f2\"]"
    );
}

#[test]
fn test_filter_expression_empty_allow_list_is_omitted() {
    let query = SearchQuery::new("sunset", "kb1").with_file_ids(vec![]);
    assert_eq!(
        Retriever::filter_expression(&query),
        "knowledge_base_id == \"kb1\""
    );
}

#[test]
fn test_filter_expression_escapes_quotes() {
    let query = SearchQuery::new("sunset", "kb\"1");
    assert_eq!(
        Retriever::filter_expression(&query),
        "knowledge_base_id == \"kb\\\"1\""
    );
}

// ============================================================================
// Parameter merging
// ============================================================================

#[tokio::test]
async fn test_search_params_caller_overrides_win() {
    let retriever = seeded_retriever(vec![], StubEmbedder::new(DIM)).await;

    let mut query = SearchQuery::new("sunset", "kb1");
    query
        .param_overrides
        .insert("ef".to_string(), json!(16));
    query
        .param_overrides
        .insert("radius".to_string(), json!(0.5));

    let params = retriever.search_params(&query);
    assert_eq!(params.get("ef"), Some(&json!(16)));
    assert_eq!(params.get("radius"), Some(&json!(0.5)));
}

#[tokio::test]
async fn test_search_params_defaults_apply() {
    let retriever = seeded_retriever(vec![], StubEmbedder::new(DIM)).await;
    let query = SearchQuery::new("sunset", "kb1");
    let params = retriever.search_params(&query);
    assert_eq!(params.get("ef"), Some(&json!(64)));
}

// ============================================================================
// Retrieval
// ============================================================================

#[tokio::test]
async fn test_retrieve_applies_similarity_floor() {
    // Query vector [1,0,0,0]; inner products are 0.8 and 0.4.
    let embedder = StubEmbedder::new(DIM).with_fixed("sunset", vec![1.0, 0.0, 0.0, 0.0]);
    let retriever = seeded_retriever(
        vec![
            record(1, "kb1", "f1", vec![0.8, 0.0, 0.0, 0.0]),
            record(2, "kb1", "f1", vec![0.4, 0.0, 0.0, 0.0]),
        ],
        embedder,
    )
    .await;

    let query = SearchQuery::new("sunset", "kb1")
        .with_min_similarity(0.6)
        .with_limit(10);
    let results = retriever.retrieve(&query).await.unwrap();

    assert_eq!(results.len(), 1);
    assert!((results[0].score - 0.8).abs() < 1e-6);
    assert_eq!(results[0].file_page, 1);
    assert_eq!(results[0].image_url, "https://img.example/p1.jpg");
}

#[tokio::test]
async fn test_retrieve_floor_is_inclusive() {
    let embedder = StubEmbedder::new(DIM).with_fixed("sunset", vec![1.0, 0.0, 0.0, 0.0]);
    let retriever = seeded_retriever(
        vec![record(1, "kb1", "f1", vec![0.6, 0.0, 0.0, 0.0])],
        embedder,
    )
    .await;

    let query = SearchQuery::new("sunset", "kb1").with_min_similarity(0.6);
    let results = retriever.retrieve(&query).await.unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_retrieve_empty_result_is_not_an_error() {
    let embedder = StubEmbedder::new(DIM).with_fixed("sunset", vec![1.0, 0.0, 0.0, 0.0]);
    let retriever = seeded_retriever(
        vec![record(1, "kb_other", "f1", vec![1.0, 0.0, 0.0, 0.0])],
        embedder,
    )
    .await;

    let query = SearchQuery::new("sunset", "kb1");
    let results = retriever.retrieve(&query).await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_retrieve_respects_file_allow_list() {
    let embedder = StubEmbedder::new(DIM).with_fixed("sunset", vec![1.0, 0.0, 0.0, 0.0]);
    let retriever = seeded_retriever(
        vec![
            record(1, "kb1", "f1", vec![0.9, 0.0, 0.0, 0.0]),
            record(2, "kb1", "f2", vec![0.8, 0.0, 0.0, 0.0]),
        ],
        embedder,
    )
    .await;

    let query = SearchQuery::new("sunset", "kb1").with_file_ids(vec!["f2".to_string()]);
    let results = retriever.retrieve(&query).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].file_id, "f2");
}

#[tokio::test]
async fn test_retrieve_respects_limit() {
    let embedder = StubEmbedder::new(DIM).with_fixed("sunset", vec![1.0, 0.0, 0.0, 0.0]);
    let records = (1..=5)
        .map(|i| record(i, "kb1", "f1", vec![1.0 / i as f32, 0.0, 0.0, 0.0]))
        .collect();
    let retriever = seeded_retriever(records, embedder).await;

    let query = SearchQuery::new("sunset", "kb1").with_limit(3);
    let results = retriever.retrieve(&query).await.unwrap();
    assert_eq!(results.len(), 3);
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every returned result clears the similarity floor.
    #[test]
    fn prop_results_clear_similarity_floor(
        components in proptest::collection::vec(-1.0f32..1.0f32, 1..20),
        floor in -1.0f32..1.0f32,
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let scores: Vec<f32> = rt.block_on(async {
            let embedder =
                StubEmbedder::new(DIM).with_fixed("sunset", vec![1.0, 0.0, 0.0, 0.0]);
            let records = components
                .iter()
                .enumerate()
                .map(|(i, c)| record(i as i64 + 1, "kb1", "f1", vec![*c, 0.0, 0.0, 0.0]))
                .collect();
            let retriever = seeded_retriever(records, embedder).await;

            let query = SearchQuery::new("sunset", "kb1")
                .with_min_similarity(floor)
                .with_limit(50);
            retriever
                .retrieve(&query)
                .await
                .unwrap()
                .iter()
                .map(|r| r.score)
                .collect()
        });

        for score in scores {
            prop_assert!(score >= floor);
        }
    }
}
