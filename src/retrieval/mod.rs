//! Query-time retrieval pipeline
//!
//! Embeds a free-text query, runs a filtered ANN search against a ready
//! collection, and shapes the raw hits into `SearchResult` values with an
//! inclusive client-side similarity floor.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::core::types::{fields, SearchQuery, SearchResult};
use crate::embeddings::{Embedder, EmbeddingError};
use crate::vector::{SearchRequest, VectorError, VectorHit, VectorStore};

/// Errors from the retrieval pipeline
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector store error: {0}")]
    Vector(#[from] VectorError),
}

/// Static search-time configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search parameters passed to the store; callers can override
    /// individual keys per query
    pub params: HashMap<String, Value>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let mut params = HashMap::new();
        // HNSW search-time accuracy/speed knob
        params.insert("ef".to_string(), json!(64));
        Self { params }
    }
}

/// Fields requested from the store to build a [`SearchResult`].
const OUTPUT_FIELDS: [&str; 6] = [
    fields::IMAGE_URL,
    fields::IMAGE_HEIGHT,
    fields::IMAGE_WIDTH,
    fields::FILE_PAGE,
    fields::FILE_ID,
    fields::FILE_NAME,
];

/// Similarity retrieval over a knowledge base.
pub struct Retriever {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
    config: SearchConfig,
}

impl Retriever {
    /// Create a retriever over the given store and embedder.
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>, config: SearchConfig) -> Self {
        Self {
            store,
            embedder,
            config,
        }
    }

    /// Run a similarity query.
    ///
    /// An empty result list is a valid outcome, not an error. The similarity
    /// floor is applied after the store returns up to `limit` candidates, so
    /// fewer than `limit` results can come back even when more rows above
    /// the floor exist beyond the ANN cutoff; that is expected behavior.
    pub async fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, RetrievalError> {
        let filter = Self::filter_expression(query);
        debug!(filter = %filter, limit = query.limit, "retrieval query");

        // Same model and dimension as ingestion; a mismatched response
        // fails inside the client rather than being truncated or padded.
        let vector = self.embedder.embed_text(&query.query).await?;

        // The store verifies collection readiness before searching.
        let request = SearchRequest {
            collection: self.store.config().collection_name.clone(),
            vectors: vec![vector],
            anns_field: fields::EMBEDDING.to_string(),
            metric: self.store.config().metric,
            params: self.search_params(query),
            limit: query.limit,
            output_fields: OUTPUT_FIELDS.iter().map(|s| s.to_string()).collect(),
            filter: Some(filter),
        };
        let hits = self.store.search(request).await?;

        let mut results: Vec<SearchResult> = hits.into_iter().map(shape_hit).collect();
        if let Some(floor) = query.min_similarity {
            results.retain(|result| result.score >= floor);
        }
        Ok(results)
    }

    /// Scalar filter expression for a query: the knowledge-base partition,
    /// conjoined with the file allow-list when one is supplied.
    pub fn filter_expression(query: &SearchQuery) -> String {
        let mut filter = format!(
            "{} == \"{}\"",
            fields::KNOWLEDGE_BASE_ID,
            escape(&query.knowledge_base_id)
        );
        if let Some(file_ids) = &query.file_ids {
            if !file_ids.is_empty() {
                let list = file_ids
                    .iter()
                    .map(|id| format!("\"{}\"", escape(id)))
                    .collect::<Vec<_>>()
                    .join(", ");
                filter.push_str(&format!(" and {} in [{list}]", fields::FILE_ID));
            }
        }
        filter
    }

    /// Static search parameters merged with the query's overrides;
    /// caller-supplied keys win on conflict.
    pub fn search_params(&self, query: &SearchQuery) -> HashMap<String, Value> {
        let mut params = self.config.params.clone();
        params.extend(query.param_overrides.clone());
        params
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Shape a raw hit into the public result type.
fn shape_hit(hit: VectorHit) -> SearchResult {
    let text = |key: &str| {
        hit.fields
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let number = |key: &str| hit.fields.get(key).and_then(Value::as_i64).unwrap_or(0);

    SearchResult {
        id: hit.id,
        image_url: text(fields::IMAGE_URL),
        image_height: number(fields::IMAGE_HEIGHT),
        image_width: number(fields::IMAGE_WIDTH),
        score: hit.distance,
        file_page: number(fields::FILE_PAGE),
        file_id: text(fields::FILE_ID),
        file_name: text(fields::FILE_NAME),
    }
}
