//! pagelens - PDF page image-embedding ingestion and similarity retrieval
//!
//! This crate provides the core of a visual document search service:
//! - Concurrent PDF-to-image rasterization with per-page failure tolerance
//! - Embedding of page images via a remote embedding service
//! - A stateful vector-store client managing collection schema, indexes and
//!   load/ready state
//! - Batched vector insertion and filtered similarity retrieval

pub mod core;
pub mod embeddings;
pub mod ingest;
pub mod logging;
pub mod retrieval;
pub mod vector;

// Re-export commonly used items
pub use crate::core::config::AppConfig;
pub use crate::core::error::{PagelensError, Result};
pub use crate::core::types::{EmbeddingRecord, SearchQuery, SearchResult};
pub use embeddings::{Embedder, EmbeddingClient, EmbeddingConfig};
pub use ingest::{BatchWriter, IngestConfig, IngestReport, PageRasterizer, PdfSource};
pub use retrieval::{Retriever, SearchConfig};
pub use vector::{Connector, MetricType, VectorDbConfig, VectorStore, VectorStoreConfig};
