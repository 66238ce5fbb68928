//! Error types for pagelens
//!
//! Per-module error enums live next to their modules; this aggregate wraps
//! them for callers that work across the whole pipeline.

use thiserror::Error;

use super::config::ConfigError;
use crate::embeddings::EmbeddingError;
use crate::ingest::{IngestError, UploadError};
use crate::retrieval::RetrievalError;
use crate::vector::VectorError;

/// Result type alias for pagelens operations
pub type Result<T> = std::result::Result<T, PagelensError>;

/// Main error type for pagelens
#[derive(Error, Debug)]
pub enum PagelensError {
    #[error("Vector store error: {0}")]
    Vector(#[from] VectorError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PagelensError {
    /// Check if the error is retryable by an outer supervisor
    pub fn is_retryable(&self) -> bool {
        match self {
            PagelensError::Vector(e) => e.is_retryable(),
            PagelensError::Embedding(e) => e.is_retryable(),
            PagelensError::Ingest(e) => !e.is_precondition(),
            PagelensError::Retrieval(RetrievalError::Embedding(e)) => e.is_retryable(),
            PagelensError::Retrieval(RetrievalError::Vector(e)) => e.is_retryable(),
            PagelensError::Upload(_) => true,
            PagelensError::Config(_) => false,
            PagelensError::Io(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors_are_not_retryable() {
        let err: PagelensError = IngestError::InvalidFileType {
            name: "report.docx".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_infrastructure_errors_are_retryable() {
        let err: PagelensError = VectorError::ConnectionFailed {
            reason: "refused".to_string(),
        }
        .into();
        assert!(err.is_retryable());

        let err: PagelensError = VectorError::LoadTimeout {
            name: "kb".to_string(),
            timeout_secs: 30,
        }
        .into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_consistency_errors_are_not_retryable() {
        let err: PagelensError = VectorError::InvalidDimension {
            expected: 2048,
            actual: 128,
        }
        .into();
        assert!(!err.is_retryable());
    }
}
