//! Search query and result types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A similarity query against one knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query to embed
    pub query: String,
    /// Knowledge base to search in
    pub knowledge_base_id: String,
    /// Optional explicit file allow-list
    #[serde(default)]
    pub file_ids: Option<Vec<String>>,
    /// Inclusive minimum similarity; hits below it are dropped client-side
    #[serde(default)]
    pub min_similarity: Option<f32>,
    /// Maximum number of hits requested from the store
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Search-time parameter overrides merged over the static configuration;
    /// caller-supplied keys win on conflict
    #[serde(default)]
    pub param_overrides: HashMap<String, Value>,
}

fn default_limit() -> usize {
    10
}

impl SearchQuery {
    /// Create a query with defaults for the optional knobs.
    pub fn new(query: impl Into<String>, knowledge_base_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            knowledge_base_id: knowledge_base_id.into(),
            file_ids: None,
            min_similarity: None,
            limit: default_limit(),
            param_overrides: HashMap::new(),
        }
    }

    /// Restrict the search to specific files.
    pub fn with_file_ids(mut self, file_ids: Vec<String>) -> Self {
        self.file_ids = Some(file_ids);
        self
    }

    /// Set the inclusive similarity floor.
    pub fn with_min_similarity(mut self, min_similarity: f32) -> Self {
        self.min_similarity = Some(min_similarity);
        self
    }

    /// Set the result cap.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

/// One shaped search hit.
///
/// `score` carries the store's similarity for the configured metric; for
/// inner-product style metrics higher means more similar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Store-assigned record id
    pub id: i64,
    /// Public URL of the rendered page image
    pub image_url: String,
    /// Rendered image height in pixels
    pub image_height: i64,
    /// Rendered image width in pixels
    pub image_width: i64,
    /// Similarity score for the configured metric
    pub score: f32,
    /// 1-based page number within the source document
    pub file_page: i64,
    /// Source document id
    pub file_id: String,
    /// Source document display name
    pub file_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder_defaults() {
        let query = SearchQuery::new("sunset", "kb1");
        assert_eq!(query.limit, 10);
        assert!(query.file_ids.is_none());
        assert!(query.min_similarity.is_none());
        assert!(query.param_overrides.is_empty());
    }

    #[test]
    fn test_query_builder_chaining() {
        let query = SearchQuery::new("sunset", "kb1")
            .with_file_ids(vec!["f1".to_string()])
            .with_min_similarity(0.6)
            .with_limit(5);
        assert_eq!(query.file_ids.as_deref(), Some(&["f1".to_string()][..]));
        assert_eq!(query.min_similarity, Some(0.6));
        assert_eq!(query.limit, 5);
    }
}
