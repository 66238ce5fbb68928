//! Tests for the embedding client

use super::*;

#[test]
fn test_embed_input_wire_shape() {
    let text = EmbedInput::Text("A beautiful sunset over the beach".to_string());
    assert_eq!(
        serde_json::to_value(&text).unwrap(),
        serde_json::json!({ "text": "A beautiful sunset over the beach" })
    );

    let image = EmbedInput::ImageUrl("https://img.example/beach1.jpg".to_string());
    assert_eq!(
        serde_json::to_value(&image).unwrap(),
        serde_json::json!({ "image": "https://img.example/beach1.jpg" })
    );
}

#[test]
fn test_embed_input_content() {
    let input = EmbedInput::ImageUrl("https://img.example/p1.jpg".to_string());
    assert_eq!(input.content(), "https://img.example/p1.jpg");
}

#[test]
fn test_config_defaults() {
    let config = EmbeddingConfig::default();
    assert_eq!(config.model, "jina-embeddings-v4");
    assert_eq!(config.task, "text-matching");
    assert_eq!(config.dimension, 2048);
    assert_eq!(config.timeout_secs, 30);
}

#[test]
fn test_client_construction() {
    let client = EmbeddingClient::new(EmbeddingConfig::default().with_dimension(128)).unwrap();
    assert_eq!(client.dimension(), 128);
}

#[tokio::test]
async fn test_embed_rejects_empty_input() {
    let client = EmbeddingClient::new(EmbeddingConfig::default()).unwrap();
    let err = client.embed(vec![]).await.unwrap_err();
    assert!(matches!(err, EmbeddingError::EmptyInput));
}

#[tokio::test]
async fn test_stub_embedder_fixed_and_fallback() {
    let stub = StubEmbedder::new(4).with_fixed("sunset", vec![0.0, 1.0, 0.0, 0.0]);

    let vectors = stub
        .embed(vec![
            EmbedInput::Text("sunset".to_string()),
            EmbedInput::Text("anything else".to_string()),
        ])
        .await
        .unwrap();
    assert_eq!(vectors[0], vec![0.0, 1.0, 0.0, 0.0]);
    assert_eq!(vectors[1], vec![1.0, 0.0, 0.0, 0.0]);
}

#[tokio::test]
async fn test_stub_embedder_failure_injection() {
    let stub = StubEmbedder::new(4).with_failure_on("https://img.example/p2.jpg");

    let err = stub
        .embed_image_url("https://img.example/p2.jpg")
        .await
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::ServiceStatus { .. }));
    assert!(err.is_retryable());
}

#[test]
fn test_error_retryability() {
    assert!(EmbeddingError::RequestFailed {
        reason: "timeout".to_string()
    }
    .is_retryable());
    assert!(EmbeddingError::ServiceStatus {
        status: 503,
        body: String::new()
    }
    .is_retryable());
    assert!(!EmbeddingError::ServiceStatus {
        status: 401,
        body: String::new()
    }
    .is_retryable());
    assert!(!EmbeddingError::DimensionMismatch {
        expected: 2048,
        actual: 1024
    }
    .is_retryable());
}
