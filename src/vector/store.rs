//! Stateful vector store client
//!
//! Wraps a backend with the collection lifecycle policy: schema + index
//! creation, explicit load with polling, and a readiness cache that is always
//! re-verified against the store before being trusted. All reads and writes
//! go through here so nothing touches a collection that is not loaded.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::backend::{
    CollectionDescriptor, LoadState, SearchRequest, VectorBackend, VectorHit,
};
use super::config::{MetricType, VectorStoreConfig};
use super::error::{VectorError, VectorResult};
use crate::core::types::EmbeddingRecord;

/// Lifecycle-managing client over a vector store backend.
///
/// Constructed once by the composition root with an explicit backend handle
/// and shared across the ingestion and retrieval pipelines.
pub struct VectorStore {
    backend: Arc<dyn VectorBackend>,
    config: VectorStoreConfig,
    /// Collections verified loaded on this handle. Never trusted blindly:
    /// a separate process or a store restart can unload a collection, so
    /// cache hits re-verify the load state.
    loaded: DashMap<String, ()>,
}

impl VectorStore {
    /// Create a client over the given backend.
    pub fn new(backend: Arc<dyn VectorBackend>, config: VectorStoreConfig) -> Self {
        Self {
            backend,
            config,
            loaded: DashMap::new(),
        }
    }

    /// Collection-level configuration.
    pub fn config(&self) -> &VectorStoreConfig {
        &self.config
    }

    /// Ensure the default collection exists and is query-ready.
    pub async fn ensure_default(&self) -> VectorResult<()> {
        let name = self.config.collection_name.clone();
        self.ensure_collection(&name, self.config.dimension, self.config.metric)
            .await
    }

    /// Ensure `name` exists with the declared schema and is loaded.
    ///
    /// Idempotent: with a healthy, already-ready collection this is a cache
    /// check plus one load-state round trip, and no create call is issued.
    pub async fn ensure_collection(
        &self,
        name: &str,
        dimension: usize,
        metric: MetricType,
    ) -> VectorResult<()> {
        if self.loaded.contains_key(name) {
            match self.backend.load_state(name).await? {
                LoadState::Loaded => {
                    debug!(collection = name, "collection already loaded");
                    return Ok(());
                }
                state => {
                    warn!(
                        collection = name,
                        ?state,
                        "collection cached as loaded but store disagrees"
                    );
                    self.loaded.remove(name);
                }
            }
        }

        if self.backend.has_collection(name).await? {
            info!(collection = name, "loading collection");
            self.backend.load_collection(name).await?;
            self.wait_for_load(name).await?;
            self.loaded.insert(name.to_string(), ());
            return Ok(());
        }

        info!(collection = name, dimension, "creating collection");
        let descriptor = CollectionDescriptor {
            name: name.to_string(),
            dimension,
            metric,
            hnsw: self.config.hnsw,
        };

        if let Err(e) = self.backend.create_collection(&descriptor).await {
            // A concurrent caller may have won the creation race; the store
            // is the source of truth for existence.
            if self.backend.has_collection(name).await.unwrap_or(false) {
                debug!(collection = name, "lost creation race, continuing with load");
            } else {
                return Err(e);
            }
        }

        // The collection must be loaded before indexes can be built online.
        self.backend.load_collection(name).await?;
        self.wait_for_load(name).await?;
        self.backend.create_indexes(&descriptor).await?;

        info!(collection = name, "collection created and indexed");
        self.loaded.insert(name.to_string(), ());
        Ok(())
    }

    /// Drop `name` if present, then create and index it from scratch.
    ///
    /// Returns `true` when a new collection was created, `false` when the
    /// collection did not exist and `force` was off.
    pub async fn recreate_collection(
        &self,
        name: &str,
        dimension: usize,
        metric: MetricType,
        force: bool,
    ) -> VectorResult<bool> {
        let exists = self.backend.has_collection(name).await?;
        if exists {
            warn!(collection = name, "collection exists, dropping");
            self.backend.drop_collection(name).await?;
            self.loaded.remove(name);
        } else if !force {
            info!(collection = name, "collection absent and force is off");
            return Ok(false);
        }

        self.ensure_collection(name, dimension, metric).await?;
        Ok(true)
    }

    /// Insert records into a ready collection.
    ///
    /// Each record is checked before dispatch: the embedding must be present
    /// with the declared dimension, and a client-supplied primary key is
    /// rejected outright.
    pub async fn insert(
        &self,
        collection: &str,
        records: Vec<EmbeddingRecord>,
    ) -> VectorResult<Vec<i64>> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            if record.embedding.is_empty() {
                return Err(VectorError::MissingEmbedding);
            }
            if record.embedding.len() != self.config.dimension {
                return Err(VectorError::InvalidDimension {
                    expected: self.config.dimension,
                    actual: record.embedding.len(),
                });
            }
            if record.has_client_id() {
                return Err(VectorError::ClientSuppliedId);
            }
            rows.push(record.into_row());
        }

        let ids = self.backend.insert(collection, rows).await?;
        info!(collection, count = ids.len(), "inserted records");
        Ok(ids)
    }

    /// Run an ANN search against a ready collection.
    pub async fn search(&self, request: SearchRequest) -> VectorResult<Vec<VectorHit>> {
        if request.vectors.is_empty() || request.vectors.iter().any(Vec::is_empty) {
            return Err(VectorError::EmptyQuery);
        }
        self.ensure_collection(&request.collection, self.config.dimension, request.metric)
            .await?;

        let hits = self.backend.search(request).await?;
        debug!(count = hits.len(), "search returned hits");
        Ok(hits)
    }

    /// Scalar filter query without a vector.
    pub async fn query(
        &self,
        collection: &str,
        filter: &str,
        output_fields: &[String],
    ) -> VectorResult<Vec<serde_json::Map<String, Value>>> {
        self.backend
            .query(collection, filter, output_fields)
            .await
    }

    /// Poll the load state until ready or the configured timeout elapses.
    async fn wait_for_load(&self, name: &str) -> VectorResult<()> {
        let timeout = Duration::from_secs(self.config.load_timeout_secs);
        let interval = Duration::from_millis(self.config.load_poll_interval_ms);
        let start = Instant::now();

        loop {
            if matches!(self.backend.load_state(name).await?, LoadState::Loaded) {
                info!(
                    collection = name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "collection loaded"
                );
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(VectorError::LoadTimeout {
                    name: name.to_string(),
                    timeout_secs: self.config.load_timeout_secs,
                });
            }
            tokio::time::sleep(interval).await;
        }
    }
}
