//! Embedding record: one row in the vector store
//!
//! A record binds a page image embedding to the provenance of the rendered
//! page. Records are immutable once written; corrections go through
//! delete + reinsert at the document level.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field names shared between the record, the collection schema and search
/// output-field lists.
pub mod fields {
    /// Server-assigned primary key (never client-supplied)
    pub const ID: &str = "id";
    /// Page image embedding vector
    pub const EMBEDDING: &str = "embedding";
    /// Public URL of the rendered page image
    pub const IMAGE_URL: &str = "image_url";
    /// Rendered image width in pixels
    pub const IMAGE_WIDTH: &str = "image_width";
    /// Rendered image height in pixels
    pub const IMAGE_HEIGHT: &str = "image_height";
    /// Source document id
    pub const FILE_ID: &str = "file_id";
    /// Source document display name
    pub const FILE_NAME: &str = "file_name";
    /// 1-based page number within the source document
    pub const FILE_PAGE: &str = "file_page";
    /// Source document URL
    pub const FILE_URL: &str = "file_url";
    /// Partition key for scalar filtering
    pub const KNOWLEDGE_BASE_ID: &str = "knowledge_base_id";
}

/// Maximum characters kept in `file_name`.
///
/// The store caps name-like fields at 100 bytes and counts bytes, not
/// characters; a CJK character is three bytes, so 25 characters keeps the
/// worst case at 75 bytes with headroom for the ellipsis and extension.
pub const MAX_FILE_NAME_CHARS: usize = 25;

/// One vector-store row: a page image embedding plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Embedding vector; non-empty, length equals the collection dimension
    pub embedding: Vec<f32>,
    /// Public URL of the rendered page image
    pub image_url: String,
    /// Rendered image width in pixels
    pub image_width: i64,
    /// Rendered image height in pixels
    pub image_height: i64,
    /// Source document id
    pub file_id: String,
    /// Source document display name (truncated to the store's byte budget)
    pub file_name: String,
    /// 1-based page number
    pub file_page: i64,
    /// Source document URL
    pub file_url: String,
    /// Knowledge base the record belongs to
    pub knowledge_base_id: String,
    /// Forward-compatible extra attributes stored via the collection's
    /// dynamic-field support; must not carry the primary key
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl EmbeddingRecord {
    /// Flatten into the field map the store's insert call expects.
    ///
    /// The primary key is omitted: it is always server-assigned.
    pub fn into_row(self) -> serde_json::Map<String, Value> {
        let mut row = serde_json::Map::new();
        row.insert(
            fields::EMBEDDING.to_string(),
            Value::from(self.embedding),
        );
        row.insert(fields::IMAGE_URL.to_string(), Value::from(self.image_url));
        row.insert(fields::IMAGE_WIDTH.to_string(), Value::from(self.image_width));
        row.insert(fields::IMAGE_HEIGHT.to_string(), Value::from(self.image_height));
        row.insert(fields::FILE_ID.to_string(), Value::from(self.file_id));
        row.insert(fields::FILE_NAME.to_string(), Value::from(self.file_name));
        row.insert(fields::FILE_PAGE.to_string(), Value::from(self.file_page));
        row.insert(fields::FILE_URL.to_string(), Value::from(self.file_url));
        row.insert(
            fields::KNOWLEDGE_BASE_ID.to_string(),
            Value::from(self.knowledge_base_id),
        );
        for (key, value) in self.extra {
            // Known fields and the primary key never come from `extra`
            if key != fields::ID && !row.contains_key(&key) {
                row.insert(key, value);
            }
        }
        row
    }

    /// Whether the record carries a client-supplied primary key in `extra`.
    pub fn has_client_id(&self) -> bool {
        self.extra.contains_key(fields::ID)
    }
}

/// Truncate a file name to `max_chars` characters, preserving the extension.
///
/// Longer names keep their extension and get an ellipsis spliced in:
/// `"a-very-long-report-name.pdf"` becomes `"a-very-long-report....pdf"`.
pub fn truncate_file_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }

    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => name.split_at(pos),
        _ => (name, ""),
    };

    let ext_chars = ext.chars().count();
    let budget = max_chars.saturating_sub(ext_chars + 3).max(1);
    let truncated: String = stem.chars().take(budget).collect();
    format!("{truncated}...{ext}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> EmbeddingRecord {
        EmbeddingRecord {
            embedding: vec![0.1, 0.2, 0.3],
            image_url: "https://img.example/p1.jpg".to_string(),
            image_width: 1654,
            image_height: 2339,
            file_id: "file-1".to_string(),
            file_name: "report.pdf".to_string(),
            file_page: 1,
            file_url: "https://files.example/report.pdf".to_string(),
            knowledge_base_id: "kb-1".to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_into_row_omits_primary_key() {
        let row = sample_record().into_row();
        assert!(!row.contains_key(fields::ID));
        assert_eq!(row.get(fields::FILE_PAGE), Some(&Value::from(1)));
        assert_eq!(
            row.get(fields::KNOWLEDGE_BASE_ID),
            Some(&Value::from("kb-1"))
        );
    }

    #[test]
    fn test_into_row_keeps_extra_but_never_id() {
        let mut record = sample_record();
        record.extra.insert("source".to_string(), Value::from("scan"));
        record.extra.insert(fields::ID.to_string(), Value::from(42));

        let row = record.into_row();
        assert_eq!(row.get("source"), Some(&Value::from("scan")));
        assert!(!row.contains_key(fields::ID));
    }

    #[test]
    fn test_extra_cannot_shadow_known_fields() {
        let mut record = sample_record();
        record
            .extra
            .insert(fields::FILE_ID.to_string(), Value::from("spoofed"));

        let row = record.into_row();
        assert_eq!(row.get(fields::FILE_ID), Some(&Value::from("file-1")));
    }

    #[test]
    fn test_has_client_id() {
        let mut record = sample_record();
        assert!(!record.has_client_id());
        record.extra.insert(fields::ID.to_string(), Value::from(7));
        assert!(record.has_client_id());
    }

    #[test]
    fn test_truncate_short_name_unchanged() {
        assert_eq!(truncate_file_name("short.pdf", 25), "short.pdf");
    }

    #[test]
    fn test_truncate_preserves_extension() {
        let name = "a-very-long-quarterly-report-name-2025.pdf";
        let truncated = truncate_file_name(name, 25);
        assert!(truncated.ends_with(".pdf"));
        assert!(truncated.contains("..."));
        assert!(truncated.chars().count() <= 25);
    }

    #[test]
    fn test_truncate_name_without_extension() {
        let truncated = truncate_file_name("abcdefghijklmnopqrstuvwxyz0123", 10);
        assert!(truncated.chars().count() <= 10);
        assert!(truncated.ends_with("..."));
    }
}
