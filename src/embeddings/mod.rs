//! Embedding client module
//!
//! Turns text or page-image references into fixed-length vectors via the
//! remote embedding service. The `Embedder` trait is the seam the ingestion
//! and retrieval pipelines depend on; `EmbeddingClient` is the HTTP
//! implementation against the service's JSON contract.

mod client;
mod error;

#[cfg(test)]
mod tests;

pub use client::{EmbeddingClient, EmbeddingConfig};
pub use error::{EmbeddingError, EmbeddingResult};

use async_trait::async_trait;
use serde::Serialize;

/// One input to the embedding service.
///
/// Serializes to the service's externally tagged shape:
/// `{"text": "..."}` or `{"image": "https://..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EmbedInput {
    /// Free text
    #[serde(rename = "text")]
    Text(String),
    /// Public URL of an image
    #[serde(rename = "image")]
    ImageUrl(String),
}

impl EmbedInput {
    /// The carried content, regardless of modality.
    pub fn content(&self) -> &str {
        match self {
            EmbedInput::Text(s) | EmbedInput::ImageUrl(s) => s,
        }
    }
}

/// Capability of producing embeddings with a fixed output dimension.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of inputs. The result is parallel to the input order;
    /// any service or shape failure is a hard error for the whole batch.
    async fn embed(&self, inputs: Vec<EmbedInput>) -> EmbeddingResult<Vec<Vec<f32>>>;

    /// Output dimension of the underlying model.
    fn dimension(&self) -> usize;

    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self.embed(vec![EmbedInput::Text(text.to_string())]).await?;
        vectors.pop().ok_or_else(|| EmbeddingError::MalformedResponse {
            reason: "empty embedding batch".to_string(),
        })
    }

    /// Embed a single image by URL.
    async fn embed_image_url(&self, image_url: &str) -> EmbeddingResult<Vec<f32>> {
        let mut vectors = self
            .embed(vec![EmbedInput::ImageUrl(image_url.to_string())])
            .await?;
        vectors.pop().ok_or_else(|| EmbeddingError::MalformedResponse {
            reason: "empty embedding batch".to_string(),
        })
    }
}

/// Deterministic embedder for tests: fixed vectors per input content with a
/// unit-vector fallback, plus per-input failure injection.
#[cfg(test)]
pub struct StubEmbedder {
    dimension: usize,
    fixed: std::collections::HashMap<String, Vec<f32>>,
    fail_on: Option<String>,
}

#[cfg(test)]
impl StubEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fixed: std::collections::HashMap::new(),
            fail_on: None,
        }
    }

    /// Return `vector` whenever an input carries `content`.
    pub fn with_fixed(mut self, content: impl Into<String>, vector: Vec<f32>) -> Self {
        self.fixed.insert(content.into(), vector);
        self
    }

    /// Fail any input carrying `content`.
    pub fn with_failure_on(mut self, content: impl Into<String>) -> Self {
        self.fail_on = Some(content.into());
        self
    }
}

#[cfg(test)]
#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, inputs: Vec<EmbedInput>) -> EmbeddingResult<Vec<Vec<f32>>> {
        inputs
            .iter()
            .map(|input| {
                let content = input.content();
                if self.fail_on.as_deref() == Some(content) {
                    return Err(EmbeddingError::ServiceStatus {
                        status: 500,
                        body: format!("injected failure for {content}"),
                    });
                }
                Ok(self.fixed.get(content).cloned().unwrap_or_else(|| {
                    let mut v = vec![0.0; self.dimension];
                    v[0] = 1.0;
                    v
                }))
            })
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
