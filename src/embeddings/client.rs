//! HTTP client for the remote embedding service
//!
//! Request: `{"model": ..., "task": ..., "input": [{"text"|"image": ...}]}`.
//! Response: `{"data": [{"embedding": [f32, ...]}, ...]}` parallel to the
//! input list. Any non-2xx status or malformed body is a hard failure; no
//! embedding is ever synthesized client-side.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{EmbeddingError, EmbeddingResult};
use super::{EmbedInput, Embedder};

/// Embedding service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Service endpoint URL
    pub endpoint: String,

    /// Bearer token for the service
    pub token: SecretString,

    /// Model identifier sent with every request
    pub model: String,

    /// Task type sent with every request
    pub task: String,

    /// Expected output dimension; responses of any other length fail fast
    pub dimension: usize,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/embeddings".to_string(),
            token: SecretString::new(String::new()),
            model: "jina-embeddings-v4".to_string(),
            task: "text-matching".to_string(),
            dimension: 2048,
            timeout_secs: 30,
        }
    }
}

impl EmbeddingConfig {
    /// Set the service endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the expected output dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    task: &'a str,
    input: &'a [EmbedInput],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbedDatum {
    embedding: Vec<f32>,
}

/// HTTP embedding client
pub struct EmbeddingClient {
    http: Client,
    config: EmbeddingConfig,
}

impl EmbeddingClient {
    /// Build a client from configuration.
    pub fn new(config: EmbeddingConfig) -> EmbeddingResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConfigError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, config })
    }

    /// Client configuration.
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, inputs: Vec<EmbedInput>) -> EmbeddingResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let body = EmbedRequest {
            model: &self.config.model,
            task: &self.config.task,
            input: &inputs,
        };

        let mut request = self.http.post(&self.config.endpoint).json(&body);
        if !self.config.token.expose_secret().is_empty() {
            request = request.bearer_auth(self.config.token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::RequestFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServiceStatus { status, body });
        }

        let parsed: EmbedResponse =
            response
                .json()
                .await
                .map_err(|e| EmbeddingError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        if parsed.data.len() != inputs.len() {
            return Err(EmbeddingError::MalformedResponse {
                reason: format!(
                    "expected {} embeddings, got {}",
                    inputs.len(),
                    parsed.data.len()
                ),
            });
        }

        let mut vectors = Vec::with_capacity(parsed.data.len());
        for datum in parsed.data {
            if datum.embedding.len() != self.config.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: datum.embedding.len(),
                });
            }
            vectors.push(datum.embedding);
        }

        debug!(count = vectors.len(), "embedding batch completed");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }
}
