//! Vector store configuration

use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Similarity metric declared on the vector index.
///
/// For `Ip` and `Cosine` a higher score means more similar; for `L2` lower
/// means more similar.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MetricType {
    /// Inner product
    #[default]
    #[serde(rename = "IP")]
    Ip,
    /// Euclidean distance
    #[serde(rename = "L2")]
    L2,
    /// Cosine similarity
    #[serde(rename = "COSINE")]
    Cosine,
}

impl MetricType {
    /// Wire name used by the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Ip => "IP",
            MetricType::L2 => "L2",
            MetricType::Cosine => "COSINE",
        }
    }

    /// Whether a higher score means a better match for this metric.
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, MetricType::L2)
    }
}

impl FromStr for MetricType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IP" => Ok(MetricType::Ip),
            "L2" => Ok(MetricType::L2),
            "COSINE" => Ok(MetricType::Cosine),
            other => Err(format!("unknown metric type: {other}")),
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HNSW index build parameters.
///
/// Fixed policy sized for the expected dataset; not tunable per call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HnswParams {
    /// Number of edges per node in the index graph
    pub m: u32,

    /// Number of neighbors considered during index construction
    pub ef_construction: u32,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            m: 32,
            ef_construction: 200,
        }
    }
}

/// Connection settings for the vector database.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Store host
    pub host: String,

    /// Store port
    pub port: u16,

    /// Database name within the store
    pub db_name: String,

    /// User name; empty disables authentication
    pub user: String,

    /// Password paired with `user`
    pub password: SecretString,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 19530,
            db_name: "default".to_string(),
            user: String::new(),
            password: SecretString::new(String::new()),
            timeout_secs: 30,
        }
    }
}

impl VectorDbConfig {
    /// Base URL of the store's HTTP endpoint.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Set the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name.
    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }
}

/// Collection-level settings for the vector store client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    /// Default collection name
    pub collection_name: String,

    /// Vector dimension (must match the embedding model output)
    pub dimension: usize,

    /// Similarity metric for the vector index
    pub metric: MetricType,

    /// HNSW index build parameters
    pub hnsw: HnswParams,

    /// Interval between load-state polls in milliseconds
    pub load_poll_interval_ms: u64,

    /// Maximum time to wait for a collection load in seconds
    pub load_timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            collection_name: "page_embeddings_v1".to_string(),
            dimension: 2048,
            metric: MetricType::default(),
            hnsw: HnswParams::default(),
            load_poll_interval_ms: 500,
            load_timeout_secs: 30,
        }
    }
}

impl VectorStoreConfig {
    /// Set the default collection name.
    pub fn with_collection_name(mut self, name: impl Into<String>) -> Self {
        self.collection_name = name.into();
        self
    }

    /// Set the vector dimension.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    /// Set the similarity metric.
    pub fn with_metric(mut self, metric: MetricType) -> Self {
        self.metric = metric;
        self
    }

    /// Set the load-state polling knobs.
    pub fn with_load_timeout(mut self, poll_interval_ms: u64, timeout_secs: u64) -> Self {
        self.load_poll_interval_ms = poll_interval_ms;
        self.load_timeout_secs = timeout_secs;
        self
    }
}
