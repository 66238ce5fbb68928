//! Vector store connector
//!
//! Owns the process-wide session to the store. `connect` performs one
//! lightweight round trip (listing collections) before the handle is
//! published; any validation failure leaves the connector disconnected and
//! propagates to the caller. No retry loop lives at this layer.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{error, info};

use super::backend::VectorBackend;
use super::config::VectorDbConfig;
use super::error::{VectorError, VectorResult};
use super::milvus::MilvusHttpBackend;

/// Holds the validated store handle; constructed once by the composition
/// root and shared read-only across callers.
pub struct Connector {
    config: VectorDbConfig,
    handle: RwLock<Option<Arc<MilvusHttpBackend>>>,
}

impl Connector {
    /// Create a disconnected connector.
    pub fn new(config: VectorDbConfig) -> Self {
        Self {
            config,
            handle: RwLock::new(None),
        }
    }

    /// Connection settings.
    pub fn config(&self) -> &VectorDbConfig {
        &self.config
    }

    /// Establish and validate the session, or return the existing handle.
    pub async fn connect(&self) -> VectorResult<Arc<MilvusHttpBackend>> {
        if let Some(handle) = self.handle.read().await.clone() {
            return Ok(handle);
        }

        // Validate outside the lock; a concurrent connect doing the same
        // work is harmless and the first published handle wins.
        let backend = Arc::new(MilvusHttpBackend::new(&self.config)?);
        match backend.list_collections().await {
            Ok(collections) => {
                info!(
                    url = %self.config.base_url(),
                    collections = collections.len(),
                    "connected to vector store"
                );
            }
            Err(e) => {
                error!(url = %self.config.base_url(), "vector store validation failed: {e}");
                return Err(VectorError::ConnectionFailed {
                    reason: e.to_string(),
                });
            }
        }

        let mut guard = self.handle.write().await;
        Ok(guard.get_or_insert(backend).clone())
    }

    /// The store handle, connecting first if necessary.
    pub async fn handle(&self) -> VectorResult<Arc<MilvusHttpBackend>> {
        self.connect().await
    }

    /// Whether a validated session is currently held.
    pub async fn is_connected(&self) -> bool {
        self.handle.read().await.is_some()
    }

    /// Drop the session; the next `connect` revalidates from scratch.
    pub async fn close(&self) {
        *self.handle.write().await = None;
    }
}
