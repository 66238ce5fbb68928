//! Tests for the vector store module

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use proptest::prelude::*;
use serde_json::Value;

use super::*;
use crate::core::types::{fields, EmbeddingRecord};

const DIM: usize = 8;

fn test_store(backend: Arc<InMemoryBackend>) -> VectorStore {
    let config = VectorStoreConfig::default()
        .with_collection_name("kb_test")
        .with_dimension(DIM)
        .with_load_timeout(10, 5);
    VectorStore::new(backend, config)
}

fn record(page: i64, kb_id: &str, embedding: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        embedding,
        image_url: format!("https://img.example/p{page}.jpg"),
        image_width: 800,
        image_height: 1100,
        file_id: "file-1".to_string(),
        file_name: "doc.pdf".to_string(),
        file_page: page,
        file_url: "https://files.example/doc.pdf".to_string(),
        knowledge_base_id: kb_id.to_string(),
        extra: BTreeMap::new(),
    }
}

fn unit_vec(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[axis] = 1.0;
    v
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_ensure_collection_creates_loads_and_indexes() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());

    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();

    assert!(backend.has_collection("kb_demo").await.unwrap());
    assert_eq!(
        backend.load_state("kb_demo").await.unwrap(),
        LoadState::Loaded
    );
    assert!(backend.index_built("kb_demo").await);
    assert_eq!(backend.stats().create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.stats().index_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ensure_collection_is_idempotent() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());

    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();
    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();

    // Second call verified the cache against the store and issued no
    // duplicate create or index calls.
    assert_eq!(backend.stats().create_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.stats().index_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        backend.load_state("kb_demo").await.unwrap(),
        LoadState::Loaded
    );
}

#[tokio::test]
async fn test_ensure_collection_reloads_when_cache_is_stale() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());

    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();

    // Simulate an external restart unloading the collection behind our back.
    backend.unload("kb_demo").await;

    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();
    assert_eq!(
        backend.load_state("kb_demo").await.unwrap(),
        LoadState::Loaded
    );
    // Recovery reloads but never recreates.
    assert_eq!(backend.stats().create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ensure_collection_loads_existing_unloaded_collection() {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .create_collection(&CollectionDescriptor {
            name: "kb_demo".to_string(),
            dimension: DIM,
            metric: MetricType::Ip,
            hnsw: HnswParams::default(),
        })
        .await
        .unwrap();
    assert_eq!(
        backend.load_state("kb_demo").await.unwrap(),
        LoadState::NotLoaded
    );

    let store = test_store(backend.clone());
    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();

    assert_eq!(
        backend.load_state("kb_demo").await.unwrap(),
        LoadState::Loaded
    );
    // The pre-existing collection was loaded, not recreated.
    assert_eq!(backend.stats().create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ensure_collection_times_out_when_load_hangs() {
    let backend = Arc::new(InMemoryBackend::new());
    backend.stick_loading(true);

    let config = VectorStoreConfig::default()
        .with_dimension(DIM)
        .with_load_timeout(5, 0);
    let store = VectorStore::new(backend, config);

    let err = store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap_err();
    assert!(matches!(err, VectorError::LoadTimeout { .. }));
}

#[tokio::test]
async fn test_recreate_collection_drops_existing() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());

    store
        .ensure_collection("kb_demo", DIM, MetricType::Ip)
        .await
        .unwrap();
    store
        .insert("kb_demo", vec![record(1, "kb1", unit_vec(0))])
        .await
        .unwrap();
    assert_eq!(backend.row_count("kb_demo").await, 1);

    let created = store
        .recreate_collection("kb_demo", DIM, MetricType::Ip, false)
        .await
        .unwrap();
    assert!(created);
    assert_eq!(backend.row_count("kb_demo").await, 0);
    assert_eq!(backend.stats().drop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_recreate_collection_absent_without_force_is_noop() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());

    let created = store
        .recreate_collection("kb_missing", DIM, MetricType::Ip, false)
        .await
        .unwrap();
    assert!(!created);
    assert!(!backend.has_collection("kb_missing").await.unwrap());
}

// ============================================================================
// Insert validation
// ============================================================================

#[tokio::test]
async fn test_insert_assigns_server_ids() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());
    store.ensure_default().await.unwrap();

    let ids = store
        .insert(
            "kb_test",
            vec![
                record(1, "kb1", unit_vec(0)),
                record(2, "kb1", unit_vec(1)),
            ],
        )
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_insert_rejects_empty_embedding() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend);

    let err = store
        .insert("kb_test", vec![record(1, "kb1", vec![])])
        .await
        .unwrap_err();
    assert!(matches!(err, VectorError::MissingEmbedding));
}

#[tokio::test]
async fn test_insert_rejects_wrong_dimension() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend);

    let err = store
        .insert("kb_test", vec![record(1, "kb1", vec![1.0, 2.0])])
        .await
        .unwrap_err();
    match err {
        VectorError::InvalidDimension { expected, actual } => {
            assert_eq!(expected, DIM);
            assert_eq!(actual, 2);
        }
        other => panic!("expected InvalidDimension, got {other:?}"),
    }
}

#[tokio::test]
async fn test_insert_rejects_client_supplied_id() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());
    store.ensure_default().await.unwrap();

    let mut bad = record(1, "kb1", unit_vec(0));
    bad.extra.insert(fields::ID.to_string(), Value::from(99));

    let err = store.insert("kb_test", vec![bad]).await.unwrap_err();
    assert!(matches!(err, VectorError::ClientSuppliedId));
    // Rejected before any network call reached the backend.
    assert_eq!(backend.stats().insert_calls.load(Ordering::SeqCst), 0);
}

// ============================================================================
// Search
// ============================================================================

async fn seeded_store() -> (Arc<InMemoryBackend>, VectorStore) {
    let backend = Arc::new(InMemoryBackend::new());
    let store = test_store(backend.clone());
    store.ensure_default().await.unwrap();
    store
        .insert(
            "kb_test",
            vec![
                record(1, "kb1", unit_vec(0)),
                record(2, "kb1", unit_vec(1)),
                record(3, "kb2", unit_vec(0)),
            ],
        )
        .await
        .unwrap();
    (backend, store)
}

fn search_request(vector: Vec<f32>, filter: Option<String>) -> SearchRequest {
    SearchRequest {
        collection: "kb_test".to_string(),
        vectors: vec![vector],
        anns_field: fields::EMBEDDING.to_string(),
        metric: MetricType::Ip,
        params: HashMap::new(),
        limit: 10,
        output_fields: vec![
            fields::KNOWLEDGE_BASE_ID.to_string(),
            fields::FILE_PAGE.to_string(),
        ],
        filter,
    }
}

#[tokio::test]
async fn test_search_applies_scalar_filter() {
    let (_backend, store) = seeded_store().await;

    let hits = store
        .search(search_request(
            unit_vec(0),
            Some("knowledge_base_id == \"kb1\"".to_string()),
        ))
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert_eq!(
            hit.fields.get(fields::KNOWLEDGE_BASE_ID),
            Some(&Value::from("kb1"))
        );
    }
    // Best match first for an inner-product metric.
    assert_eq!(hits[0].fields.get(fields::FILE_PAGE), Some(&Value::from(1)));
}

#[tokio::test]
async fn test_search_with_file_id_allow_list() {
    let (_backend, store) = seeded_store().await;

    let filter = "knowledge_base_id == \"kb1\" and file_id in [\"file-1\"]";
    let hits = store
        .search(search_request(unit_vec(0), Some(filter.to_string())))
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);

    let filter = "knowledge_base_id == \"kb1\" and file_id in [\"other\"]";
    let hits = store
        .search(search_request(unit_vec(0), Some(filter.to_string())))
        .await
        .unwrap();
    assert!(hits.is_empty());
}

#[tokio::test]
async fn test_search_rejects_empty_query_vector() {
    let (_backend, store) = seeded_store().await;

    let err = store
        .search(search_request(vec![], None))
        .await
        .unwrap_err();
    assert!(matches!(err, VectorError::EmptyQuery));
}

#[tokio::test]
async fn test_query_returns_matching_rows() {
    let (_backend, store) = seeded_store().await;

    let rows = store
        .query(
            "kb_test",
            "knowledge_base_id == \"kb2\"",
            &[fields::FILE_PAGE.to_string()],
        )
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get(fields::FILE_PAGE), Some(&Value::from(3)));
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Search never returns more hits than the requested limit.
    #[test]
    fn prop_search_respects_limit(
        num_vectors in 1usize..40,
        limit in 1usize..20,
        seed in any::<u64>(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let hit_count = rt.block_on(async {
            use rand::{Rng, SeedableRng};
            let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

            let backend = Arc::new(InMemoryBackend::new());
            let store = test_store(backend);
            store.ensure_default().await.unwrap();

            let records: Vec<EmbeddingRecord> = (0..num_vectors)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
                    record(i as i64 + 1, "kb1", embedding)
                })
                .collect();
            store.insert("kb_test", records).await.unwrap();

            let query: Vec<f32> = (0..DIM).map(|_| rng.gen_range(-1.0..1.0)).collect();
            let mut request = search_request(query, None);
            request.limit = limit;

            store.search(request).await.unwrap().len()
        });

        prop_assert!(hit_count <= limit);
        if num_vectors >= limit {
            prop_assert_eq!(hit_count, limit);
        }
    }
}
