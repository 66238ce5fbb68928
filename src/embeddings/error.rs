//! Error types for the embedding client

use thiserror::Error;

/// Result type for embedding operations
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Errors that can occur while obtaining embeddings
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Nothing to embed
    #[error("Embedding input cannot be empty")]
    EmptyInput,

    /// Client construction failed
    #[error("Embedding client configuration error: {reason}")]
    ConfigError { reason: String },

    /// Transport-level failure (connect, timeout)
    #[error("Embedding request failed: {reason}")]
    RequestFailed { reason: String },

    /// Service answered with a non-2xx status
    #[error("Embedding service returned HTTP {status}: {body}")]
    ServiceStatus { status: u16, body: String },

    /// Response body did not match the contract
    #[error("Malformed embedding response: {reason}")]
    MalformedResponse { reason: String },

    /// Returned vector does not match the configured dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl EmbeddingError {
    /// Check if this error is retryable by an outer supervisor
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::RequestFailed { .. } => true,
            EmbeddingError::ServiceStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
