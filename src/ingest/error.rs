//! Error types for the ingestion pipeline

use thiserror::Error;

use super::upload::UploadError;
use crate::embeddings::EmbeddingError;
use crate::vector::VectorError;

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors that can occur during PDF ingestion
#[derive(Error, Debug)]
pub enum IngestError {
    /// Upload is not a PDF by name or magic bytes; nothing was attempted
    #[error("File is not a PDF: {name}")]
    InvalidFileType { name: String },

    /// Explicitly requested pages fall outside the document
    #[error("Pages {pages:?} out of range (1-{total})")]
    PageOutOfRange { pages: Vec<i32>, total: i32 },

    /// Document could not be opened at all
    #[error("Unreadable PDF: {reason}")]
    UnreadablePdf { reason: String },

    /// Rendering one page failed
    #[error("Rendering page {page} failed: {reason}")]
    Render { page: i32, reason: String },

    /// Every attempted page failed
    #[error("All {attempted} attempted pages failed")]
    AllPagesFailed { attempted: usize },

    /// A record failed pre-dispatch validation in the batch writer
    #[error("Record {index} rejected: {reason}")]
    RecordRejected { index: usize, reason: String },

    #[error("Image upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store error: {0}")]
    Vector(#[from] VectorError),
}

impl IngestError {
    /// Whether the error is a job-level precondition failure (nothing was
    /// attempted) as opposed to a runtime failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            IngestError::InvalidFileType { .. }
                | IngestError::PageOutOfRange { .. }
                | IngestError::UnreadablePdf { .. }
        )
    }
}
