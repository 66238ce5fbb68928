//! Vector store backend contract
//!
//! The backend trait captures the wire-level operations the store exposes;
//! lifecycle policy (readiness cache, polling, index building order) lives in
//! [`super::store::VectorStore`]. Implementations: the HTTP backend against a
//! live store and an in-memory backend for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use super::config::{HnswParams, MetricType};
use super::error::VectorResult;
use crate::core::types::fields;

/// Load state of a collection in the store's serving tier.
///
/// A collection can exist in durable storage without being queryable; it must
/// be loaded (and the load observed) before reads or writes are valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Data resident and queryable
    Loaded,
    /// Load in progress
    Loading,
    /// Exists but not loaded
    NotLoaded,
    /// Collection does not exist
    NotExist,
}

/// Scalar field declaration for the collection schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Field name
    pub name: &'static str,
    /// Store data type name
    pub data_type: &'static str,
    /// Max length for VarChar fields
    pub max_length: Option<u32>,
}

/// Scalar fields of the page-embedding schema, in declaration order.
///
/// The primary key (`id`, auto-generated Int64) and the vector field are
/// declared separately by the backend.
pub const SCALAR_FIELDS: [FieldSpec; 8] = [
    FieldSpec { name: fields::IMAGE_URL, data_type: "VarChar", max_length: Some(512) },
    FieldSpec { name: fields::IMAGE_WIDTH, data_type: "Int64", max_length: None },
    FieldSpec { name: fields::IMAGE_HEIGHT, data_type: "Int64", max_length: None },
    FieldSpec { name: fields::FILE_ID, data_type: "VarChar", max_length: Some(100) },
    FieldSpec { name: fields::FILE_NAME, data_type: "VarChar", max_length: Some(100) },
    FieldSpec { name: fields::FILE_PAGE, data_type: "Int64", max_length: None },
    FieldSpec { name: fields::FILE_URL, data_type: "VarChar", max_length: Some(512) },
    FieldSpec { name: fields::KNOWLEDGE_BASE_ID, data_type: "VarChar", max_length: Some(100) },
];

/// Scalar fields carrying an inverted index for filter performance.
pub const INVERTED_INDEX_FIELDS: [&str; 2] = [fields::KNOWLEDGE_BASE_ID, fields::FILE_NAME];

/// Schema + index contract for a named collection.
#[derive(Debug, Clone)]
pub struct CollectionDescriptor {
    /// Collection name
    pub name: String,
    /// Vector dimension
    pub dimension: usize,
    /// Similarity metric for the vector index
    pub metric: MetricType,
    /// HNSW build parameters
    pub hnsw: HnswParams,
}

/// One ANN search call.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    /// Target collection
    pub collection: String,
    /// Query vectors
    pub vectors: Vec<Vec<f32>>,
    /// Vector field to search on
    pub anns_field: String,
    /// Metric the search scores with
    pub metric: MetricType,
    /// Search-time parameters (already merged by the caller)
    pub params: HashMap<String, Value>,
    /// Result cap
    pub limit: usize,
    /// Fields to return with each hit
    pub output_fields: Vec<String>,
    /// Optional scalar filter expression
    pub filter: Option<String>,
}

/// One raw hit from an ANN search.
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Store-assigned record id
    pub id: i64,
    /// Raw distance/similarity for the search metric
    pub distance: f32,
    /// Requested output fields
    pub fields: serde_json::Map<String, Value>,
}

/// Wire-level operations of the vector store.
#[async_trait]
pub trait VectorBackend: Send + Sync {
    /// List collection names in the configured database.
    async fn list_collections(&self) -> VectorResult<Vec<String>>;

    /// Whether a collection exists.
    async fn has_collection(&self, name: &str) -> VectorResult<bool>;

    /// Create a collection from the descriptor (auto-id primary key,
    /// dynamic-field tolerance, Strong consistency).
    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> VectorResult<()>;

    /// Drop a collection and its data.
    async fn drop_collection(&self, name: &str) -> VectorResult<()>;

    /// Trigger a collection load. Completion is observed via [`Self::load_state`].
    async fn load_collection(&self, name: &str) -> VectorResult<()>;

    /// Current load state of a collection.
    async fn load_state(&self, name: &str) -> VectorResult<LoadState>;

    /// Build the vector index and the inverted scalar indexes.
    async fn create_indexes(&self, descriptor: &CollectionDescriptor) -> VectorResult<()>;

    /// Insert rows (primary key omitted); returns server-assigned ids.
    async fn insert(
        &self,
        collection: &str,
        rows: Vec<serde_json::Map<String, Value>>,
    ) -> VectorResult<Vec<i64>>;

    /// Run an ANN search.
    async fn search(&self, request: SearchRequest) -> VectorResult<Vec<VectorHit>>;

    /// Scalar filter query without a vector.
    async fn query(
        &self,
        collection: &str,
        filter: &str,
        output_fields: &[String],
    ) -> VectorResult<Vec<serde_json::Map<String, Value>>>;
}
