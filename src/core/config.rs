//! Application configuration
//!
//! Composes the per-module settings into one `AppConfig` owned by the
//! process's composition root. Loading is layered: built-in defaults, then
//! an optional config file, then environment variables prefixed `PAGELENS`
//! (nested keys separated by `__`, e.g. `PAGELENS_CONNECTION__HOST`).

use serde::Deserialize;
use thiserror::Error;

use crate::embeddings::EmbeddingConfig;
use crate::ingest::{IngestConfig, UploadConfig};
use crate::logging::LoggingConfig;
use crate::retrieval::SearchConfig;
use crate::vector::{VectorDbConfig, VectorStoreConfig};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config load failed: {0}")]
    Load(#[from] config::ConfigError),
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Vector store connection settings
    pub connection: VectorDbConfig,

    /// Collection schema and lifecycle settings
    pub collection: VectorStoreConfig,

    /// Embedding service settings
    pub embedding: EmbeddingConfig,

    /// Ingestion pipeline settings
    pub ingest: IngestConfig,

    /// Image upload settings
    pub upload: UploadConfig,

    /// Search-time settings
    pub search: SearchConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load from environment variables only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load with an optional config file underneath the environment layer.
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("PAGELENS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.connection.port, 19530);
        assert_eq!(config.collection.dimension, 2048);
        assert_eq!(config.collection.hnsw.m, 32);
        assert_eq!(config.collection.hnsw.ef_construction, 200);
        assert_eq!(config.ingest.max_workers, 4);
        assert_eq!(config.ingest.batch_size, 80);
        assert_eq!(config.ingest.jpeg_quality, 95);
        assert_eq!(config.embedding.dimension, 2048);
    }

    #[test]
    fn test_load_without_sources_matches_defaults() {
        let loaded = AppConfig::load(None).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(
            loaded.collection.collection_name,
            defaults.collection.collection_name
        );
        assert_eq!(loaded.ingest.dpi, defaults.ingest.dpi);
    }
}
