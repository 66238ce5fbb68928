//! PDF ingestion pipeline
//!
//! Turns an uploaded PDF into embedding records: every selected page is
//! rendered to a JPEG, uploaded for a public URL, embedded, and handed to the
//! batch writer for persistence. Page work runs on a fixed worker pool and
//! tolerates per-page failures; only job-level preconditions abort a job.

mod error;
mod rasterizer;
pub mod upload;
mod writer;


pub use error::{IngestError, IngestResult};
pub use rasterizer::{PageRasterizer, PdfSource};
pub use upload::{HttpUploader, ImageUploader, UploadConfig, UploadError, UploaderRegistry};
pub use writer::BatchWriter;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::core::types::EmbeddingRecord;

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Fixed worker pool size for page conversion
    pub max_workers: usize,

    /// Rendering resolution; zoom factor is dpi / 72
    pub dpi: u32,

    /// JPEG quality for encoded page images (0-100)
    pub jpeg_quality: u8,

    /// Records per insert call issued by the batch writer
    pub batch_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            dpi: 150,
            jpeg_quality: 95,
            batch_size: 80,
        }
    }
}

impl IngestConfig {
    /// Set the worker pool size.
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Set the rendering DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set the insert batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// One page that failed conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFailure {
    /// 1-based page number
    pub page: i32,
    /// Error message for the failure
    pub reason: String,
}

/// Outcome of one ingestion job.
#[derive(Debug)]
pub struct IngestReport {
    /// Completed records, in completion order (not page order)
    pub records: Vec<EmbeddingRecord>,
    /// Pages that failed, with their reasons
    pub failures: Vec<PageFailure>,
    /// Number of pages submitted for conversion
    pub attempted: usize,
    /// Wall-clock duration of the job
    pub elapsed: Duration,
}

impl IngestReport {
    /// Number of successfully converted pages.
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }

    /// Number of failed pages.
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// Document-level metadata recorded with the external document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Original file name
    pub file_name: String,
    /// Size of the upload in bytes
    pub file_size: u64,
    /// Source document URL
    pub file_url: String,
    /// File extension, e.g. ".pdf"
    pub file_type: String,
    /// Knowledge base the document belongs to
    pub knowledge_base_id: String,
    /// When the document entered the pipeline
    pub uploaded_at: DateTime<Utc>,
}

/// Error from the document-metadata collaborator
#[derive(Debug, Error)]
#[error("File registry error: {reason}")]
pub struct RegistryError {
    pub reason: String,
}

/// Consumed interface: document-metadata bookkeeping.
///
/// Recording is best-effort; the rasterizer logs failures and carries on,
/// since page ingestion is the primary goal.
#[async_trait]
pub trait FileRegistry: Send + Sync {
    /// Record an ingested document; returns the registry's record id.
    async fn record_file(&self, file: &FileMetadata) -> Result<String, RegistryError>;
}

/// Registry that records nothing and hands back a fresh id.
pub struct NoopFileRegistry;

#[async_trait]
impl FileRegistry for NoopFileRegistry {
    async fn record_file(&self, _file: &FileMetadata) -> Result<String, RegistryError> {
        Ok(Uuid::now_v7().to_string())
    }
}
