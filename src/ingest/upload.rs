//! Image upload backends
//!
//! Rendered page images are uploaded to an external service in exchange for
//! a public URL the embedding service can fetch. Backends implement the
//! `ImageUploader` capability and register in a registry keyed by name.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Errors from an upload backend
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload backend configuration error: {reason}")]
    ConfigError { reason: String },

    #[error("Unknown upload backend: {name}")]
    UnknownBackend { name: String },

    #[error("Upload request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Upload service returned HTTP {status}: {body}")]
    ServiceStatus { status: u16, body: String },

    #[error("Malformed upload response: {reason}")]
    MalformedResponse { reason: String },
}

/// Capability of turning image bytes into a public URL.
#[async_trait]
pub trait ImageUploader: Send + Sync {
    /// Upload `bytes` with the given content type and return the public URL.
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, UploadError>;
}

/// Upload service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Upload endpoint URL
    pub endpoint: String,

    /// Registered backend to use
    pub backend: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8090/files/upload".to_string(),
            backend: "http".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    result: UploadResult,
}

#[derive(Debug, Deserialize)]
struct UploadResult {
    file_url: String,
}

/// Multipart HTTP uploader
pub struct HttpUploader {
    http: Client,
    endpoint: String,
}

impl HttpUploader {
    /// Build an uploader from configuration.
    pub fn new(config: &UploadConfig) -> Result<Self, UploadError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UploadError::ConfigError {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ImageUploader for HttpUploader {
    async fn upload(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, UploadError> {
        let extension = content_type.rsplit('/').next().unwrap_or("bin");
        let file_name = format!("{}.{}", Uuid::now_v7(), extension);

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(content_type)
            .map_err(|e| UploadError::ConfigError {
                reason: format!("invalid content type {content_type}: {e}"),
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::RequestFailed {
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::ServiceStatus { status, body });
        }

        let parsed: UploadResponse =
            response
                .json()
                .await
                .map_err(|e| UploadError::MalformedResponse {
                    reason: e.to_string(),
                })?;

        debug!(url = %parsed.result.file_url, "image uploaded");
        Ok(parsed.result.file_url)
    }
}

/// Registry of upload backends keyed by name.
///
/// New backends implement [`ImageUploader`] and register under a name; no
/// inheritance hierarchy is involved.
#[derive(Default)]
pub struct UploaderRegistry {
    backends: HashMap<String, Arc<dyn ImageUploader>>,
}

impl UploaderRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the default HTTP backend registered as "http".
    pub fn with_http(config: &UploadConfig) -> Result<Self, UploadError> {
        let mut registry = Self::new();
        registry.register("http", Arc::new(HttpUploader::new(config)?));
        Ok(registry)
    }

    /// Register a backend under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, uploader: Arc<dyn ImageUploader>) {
        self.backends.insert(name.into(), uploader);
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ImageUploader>, UploadError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| UploadError::UnknownBackend {
                name: name.to_string(),
            })
    }
}
