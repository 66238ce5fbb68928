//! Vector store error types

use thiserror::Error;

/// Result type for vector operations
pub type VectorResult<T> = Result<T, VectorError>;

/// Vector store specific errors
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Failed to connect to vector store: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Vector store request failed ({operation}): {reason}")]
    RequestFailed { operation: String, reason: String },

    #[error("Vector store rejected {operation} (code {code}): {message}")]
    StoreError {
        operation: String,
        code: i64,
        message: String,
    },

    #[error("Malformed vector store response: {reason}")]
    InvalidResponse { reason: String },

    #[error("Collection not found: {name}")]
    CollectionNotFound { name: String },

    #[error("Collection {name} did not load within {timeout_secs}s")]
    LoadTimeout { name: String, timeout_secs: u64 },

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Record is missing a non-empty embedding vector")]
    MissingEmbedding,

    #[error("Record carries a client-supplied primary key; ids are server-assigned")]
    ClientSuppliedId,

    #[error("Query vectors cannot be empty")]
    EmptyQuery,
}

impl VectorError {
    /// Check if the error is retryable by an outer supervisor
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            VectorError::ConnectionFailed { .. }
                | VectorError::RequestFailed { .. }
                | VectorError::LoadTimeout { .. }
        )
    }
}
