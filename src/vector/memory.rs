//! In-memory vector store backend
//!
//! Implements the full backend contract against process-local state: brute
//! force similarity scoring and a small interpreter for the filter subset the
//! pipelines emit (`field == "value"`, `field in [..]`, joined with `and`).
//! Used by the test suite and for local development without a running store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{CollectionDescriptor, LoadState, SearchRequest, VectorBackend, VectorHit};
use super::config::MetricType;
use super::error::{VectorError, VectorResult};
use crate::core::types::fields;

#[derive(Debug)]
struct MemCollection {
    descriptor: CollectionDescriptor,
    loaded: bool,
    indexed: bool,
    next_id: i64,
    rows: Vec<(i64, serde_json::Map<String, Value>)>,
}

/// Per-operation call counters, readable from tests.
#[derive(Debug, Default)]
pub struct BackendStats {
    pub create_calls: AtomicU64,
    pub load_calls: AtomicU64,
    pub index_calls: AtomicU64,
    pub insert_calls: AtomicU64,
    pub search_calls: AtomicU64,
    pub drop_calls: AtomicU64,
}

/// Process-local backend holding collections in memory.
pub struct InMemoryBackend {
    collections: RwLock<HashMap<String, MemCollection>>,
    stats: BackendStats,
    /// Insert calls allowed before forced failure (fault injection)
    insert_budget: AtomicU64,
    /// When set, load_state always reports Loading
    stuck_loading: std::sync::atomic::AtomicBool,
}

impl InMemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            stats: BackendStats::default(),
            insert_budget: AtomicU64::new(u64::MAX),
            stuck_loading: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Operation call counters.
    pub fn stats(&self) -> &BackendStats {
        &self.stats
    }

    /// Fail every insert call after the next `budget` calls.
    pub fn limit_inserts(&self, budget: u64) {
        self.insert_budget.store(budget, Ordering::SeqCst);
    }

    /// Make every load appear to hang in the Loading state.
    pub fn stick_loading(&self, stuck: bool) {
        self.stuck_loading.store(stuck, Ordering::SeqCst);
    }

    /// Administratively unload a collection, as a store restart would.
    pub async fn unload(&self, name: &str) {
        if let Some(collection) = self.collections.write().await.get_mut(name) {
            collection.loaded = false;
        }
    }

    /// Whether create_indexes ran for a collection.
    pub async fn index_built(&self, name: &str) -> bool {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.indexed)
            .unwrap_or(false)
    }

    /// Number of rows currently stored in a collection.
    pub async fn row_count(&self, name: &str) -> usize {
        self.collections
            .read()
            .await
            .get(name)
            .map(|c| c.rows.len())
            .unwrap_or(0)
    }

    fn similarity(metric: MetricType, a: &[f32], b: &[f32]) -> f32 {
        match metric {
            MetricType::Ip => dot_product(a, b),
            MetricType::Cosine => cosine_similarity(a, b),
            MetricType::L2 => euclidean_distance(a, b),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorBackend for InMemoryBackend {
    async fn list_collections(&self) -> VectorResult<Vec<String>> {
        Ok(self.collections.read().await.keys().cloned().collect())
    }

    async fn has_collection(&self, name: &str) -> VectorResult<bool> {
        Ok(self.collections.read().await.contains_key(name))
    }

    async fn create_collection(&self, descriptor: &CollectionDescriptor) -> VectorResult<()> {
        self.stats.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.write().await;
        // Concurrent duplicate creation degrades to a no-op; the caller
        // re-checks existence on failure anyway.
        collections
            .entry(descriptor.name.clone())
            .or_insert_with(|| MemCollection {
                descriptor: descriptor.clone(),
                loaded: false,
                indexed: false,
                next_id: 1,
                rows: Vec::new(),
            });
        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> VectorResult<()> {
        self.stats.drop_calls.fetch_add(1, Ordering::SeqCst);
        self.collections.write().await.remove(name);
        Ok(())
    }

    async fn load_collection(&self, name: &str) -> VectorResult<()> {
        self.stats.load_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.write().await;
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| VectorError::CollectionNotFound {
                name: name.to_string(),
            })?;
        collection.loaded = true;
        Ok(())
    }

    async fn load_state(&self, name: &str) -> VectorResult<LoadState> {
        if self.stuck_loading.load(Ordering::SeqCst) {
            return Ok(LoadState::Loading);
        }
        let collections = self.collections.read().await;
        Ok(match collections.get(name) {
            None => LoadState::NotExist,
            Some(c) if c.loaded => LoadState::Loaded,
            Some(_) => LoadState::NotLoaded,
        })
    }

    async fn create_indexes(&self, descriptor: &CollectionDescriptor) -> VectorResult<()> {
        self.stats.index_calls.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.write().await;
        let collection = collections.get_mut(&descriptor.name).ok_or_else(|| {
            VectorError::CollectionNotFound {
                name: descriptor.name.clone(),
            }
        })?;
        collection.indexed = true;
        Ok(())
    }

    async fn insert(
        &self,
        collection: &str,
        rows: Vec<serde_json::Map<String, Value>>,
    ) -> VectorResult<Vec<i64>> {
        self.stats.insert_calls.fetch_add(1, Ordering::SeqCst);
        if self.insert_budget.fetch_sub(1, Ordering::SeqCst) == 0 {
            self.insert_budget.store(0, Ordering::SeqCst);
            return Err(VectorError::RequestFailed {
                operation: "insert".to_string(),
                reason: "injected insert failure".to_string(),
            });
        }

        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| VectorError::CollectionNotFound {
                name: collection.to_string(),
            })?;

        let expected = stored.descriptor.dimension;
        let mut ids = Vec::with_capacity(rows.len());
        for row in rows {
            let vector_len = row
                .get(fields::EMBEDDING)
                .and_then(|v| v.as_array())
                .map(|v| v.len())
                .ok_or(VectorError::MissingEmbedding)?;
            if vector_len != expected {
                return Err(VectorError::InvalidDimension {
                    expected,
                    actual: vector_len,
                });
            }
            let id = stored.next_id;
            stored.next_id += 1;
            stored.rows.push((id, row));
            ids.push(id);
        }
        debug!(collection, count = ids.len(), "in-memory insert");
        Ok(ids)
    }

    async fn search(&self, request: SearchRequest) -> VectorResult<Vec<VectorHit>> {
        self.stats.search_calls.fetch_add(1, Ordering::SeqCst);
        if request.vectors.is_empty() || request.vectors.iter().any(Vec::is_empty) {
            return Err(VectorError::EmptyQuery);
        }

        let collections = self.collections.read().await;
        let stored = collections.get(&request.collection).ok_or_else(|| {
            VectorError::CollectionNotFound {
                name: request.collection.clone(),
            }
        })?;

        let query = &request.vectors[0];
        if query.len() != stored.descriptor.dimension {
            return Err(VectorError::InvalidDimension {
                expected: stored.descriptor.dimension,
                actual: query.len(),
            });
        }

        let filter = request
            .filter
            .as_deref()
            .map(FilterExpr::parse)
            .transpose()?;

        let mut scored: Vec<(i64, f32, &serde_json::Map<String, Value>)> = stored
            .rows
            .iter()
            .filter(|(_, row)| filter.as_ref().map(|f| f.matches(row)).unwrap_or(true))
            .map(|(id, row)| {
                let vector: Vec<f32> = row
                    .get(fields::EMBEDDING)
                    .and_then(|v| v.as_array())
                    .map(|v| {
                        v.iter()
                            .filter_map(Value::as_f64)
                            .map(|f| f as f32)
                            .collect()
                    })
                    .unwrap_or_default();
                (*id, Self::similarity(request.metric, query, &vector), row)
            })
            .collect();

        // L2 distances rank ascending, similarity metrics descending
        if request.metric.higher_is_better() {
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        } else {
            scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        }

        let hits = scored
            .into_iter()
            .take(request.limit)
            .map(|(id, distance, row)| {
                let fields_out: serde_json::Map<String, Value> = if request.output_fields.is_empty()
                {
                    row.clone()
                } else {
                    request
                        .output_fields
                        .iter()
                        .filter_map(|name| row.get(name).map(|v| (name.clone(), v.clone())))
                        .collect()
                };
                VectorHit {
                    id,
                    distance,
                    fields: fields_out,
                }
            })
            .collect();
        Ok(hits)
    }

    async fn query(
        &self,
        collection: &str,
        filter: &str,
        output_fields: &[String],
    ) -> VectorResult<Vec<serde_json::Map<String, Value>>> {
        let collections = self.collections.read().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| VectorError::CollectionNotFound {
                name: collection.to_string(),
            })?;

        let expr = FilterExpr::parse(filter)?;
        let rows = stored
            .rows
            .iter()
            .filter(|(_, row)| expr.matches(row))
            .map(|(id, row)| {
                let mut out: serde_json::Map<String, Value> = if output_fields.is_empty() {
                    row.clone()
                } else {
                    output_fields
                        .iter()
                        .filter_map(|name| row.get(name).map(|v| (name.clone(), v.clone())))
                        .collect()
                };
                out.insert(fields::ID.to_string(), Value::from(*id));
                out
            })
            .collect();
        Ok(rows)
    }
}

/// Parsed filter: conjunction of equality and membership conditions.
#[derive(Debug)]
struct FilterExpr {
    conditions: Vec<Condition>,
}

#[derive(Debug)]
enum Condition {
    Eq { field: String, value: String },
    In { field: String, values: Vec<String> },
}

impl FilterExpr {
    /// Parse the filter subset the retrieval pipeline emits.
    fn parse(input: &str) -> VectorResult<Self> {
        let mut conditions = Vec::new();
        for clause in input.split(" and ") {
            let clause = clause.trim();
            if clause.is_empty() {
                continue;
            }
            if let Some((field, rest)) = clause.split_once("==") {
                conditions.push(Condition::Eq {
                    field: field.trim().to_string(),
                    value: unquote(rest.trim()).to_string(),
                });
            } else if let Some((field, rest)) = clause.split_once(" in ") {
                let rest = rest.trim();
                let inner = rest
                    .strip_prefix('[')
                    .and_then(|r| r.strip_suffix(']'))
                    .ok_or_else(|| VectorError::InvalidResponse {
                        reason: format!("unsupported filter clause: {clause}"),
                    })?;
                let values = inner
                    .split(',')
                    .map(|v| unquote(v.trim()).to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                conditions.push(Condition::In {
                    field: field.trim().to_string(),
                    values,
                });
            } else {
                return Err(VectorError::InvalidResponse {
                    reason: format!("unsupported filter clause: {clause}"),
                });
            }
        }
        Ok(Self { conditions })
    }

    fn matches(&self, row: &serde_json::Map<String, Value>) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq { field, value } => {
                row.get(field).map(|v| value_eq(v, value)).unwrap_or(false)
            }
            Condition::In { field, values } => row
                .get(field)
                .map(|v| values.iter().any(|candidate| value_eq(v, candidate)))
                .unwrap_or(false),
        })
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}

fn value_eq(value: &Value, text: &str) -> bool {
    match value {
        Value::String(s) => s == text,
        Value::Number(n) => n.to_string() == text,
        _ => false,
    }
}

fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot = dot_product(a, b);
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}
