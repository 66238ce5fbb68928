//! Batch ingest writer
//!
//! Chunks embedding records into bounded batches and issues one insert call
//! per batch, sequentially. Batches are independent units of durability: a
//! mid-run failure leaves earlier batches committed.

use std::sync::Arc;

use tracing::info;

use super::error::{IngestError, IngestResult};
use crate::core::types::EmbeddingRecord;
use crate::vector::VectorStore;

/// Writes embedding records to the vector store in bounded batches.
pub struct BatchWriter {
    store: Arc<VectorStore>,
    batch_size: usize,
}

impl BatchWriter {
    /// Create a writer with the given batch size.
    pub fn new(store: Arc<VectorStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    /// Validate and persist `records`.
    ///
    /// Every record is checked before any batch is dispatched: a missing or
    /// mis-dimensioned embedding or a client-supplied primary key rejects
    /// the whole call without touching the store. Returns the number of
    /// records written.
    pub async fn write(&self, records: Vec<EmbeddingRecord>) -> IngestResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let dimension = self.store.config().dimension;
        for (index, record) in records.iter().enumerate() {
            if record.embedding.is_empty() {
                return Err(IngestError::RecordRejected {
                    index,
                    reason: "missing embedding vector".to_string(),
                });
            }
            if record.embedding.len() != dimension {
                return Err(IngestError::RecordRejected {
                    index,
                    reason: format!(
                        "embedding dimension {} does not match collection dimension {}",
                        record.embedding.len(),
                        dimension
                    ),
                });
            }
            if record.has_client_id() {
                return Err(IngestError::RecordRejected {
                    index,
                    reason: "primary keys are server-assigned".to_string(),
                });
            }
        }

        // The collection must be loaded before any write is valid.
        self.store.ensure_default().await?;
        let collection = self.store.config().collection_name.clone();

        let total = records.len();
        let mut written = 0;
        let mut iter = records.into_iter();
        loop {
            let batch: Vec<EmbeddingRecord> = iter.by_ref().take(self.batch_size).collect();
            if batch.is_empty() {
                break;
            }
            written += self.store.insert(&collection, batch).await?.len();
        }

        info!(collection = %collection, written, total, "batch write complete");
        Ok(written)
    }
}
