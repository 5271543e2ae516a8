//! Core domain types for ragdesk
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Document** | A file uploaded to the knowledge base, processed asynchronously by the backend |
//! | **Status** | Where the backend is in processing a document |
//! | **Terminal status** | `Processed` or `Failed`; nothing changes after this |
//! | **In-flight** | A document whose status is being polled |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Document Status
// ============================================

/// Backend processing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Accepted, waiting for a worker
    Queued,
    /// Being parsed, chunked and embedded
    Processing,
    /// Ready for retrieval
    Processed,
    /// Processing gave up
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Queued => "queued",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Processed => "processed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// No further status changes are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Processed | DocumentStatus::Failed)
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(DocumentStatus::Queued),
            "processing" => Ok(DocumentStatus::Processing),
            "processed" => Ok(DocumentStatus::Processed),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(format!("unknown document status: {}", s)),
        }
    }
}

// ============================================
// Document
// ============================================

/// A document record as returned by the document API.
///
/// Only `id` and `status` are interpreted. Everything else the server sends
/// (filename, size, chunk counts, ...) is kept verbatim in `fields` so a
/// merge never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub status: DocumentStatus,
    /// Upload time, if the server reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Remaining server fields
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, status: DocumentStatus) -> Self {
        Self {
            id: id.into(),
            status,
            created_at: None,
            fields: serde_json::Map::new(),
        }
    }

    /// Display name: the server's `filename` or `title` field, else the id.
    pub fn display_name(&self) -> &str {
        ["filename", "title"]
            .iter()
            .find_map(|key| self.fields.get(*key).and_then(|v| v.as_str()))
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!DocumentStatus::Queued.is_terminal());
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(DocumentStatus::Processed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "processing".parse::<DocumentStatus>().unwrap(),
            DocumentStatus::Processing
        );
        assert!("done".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_document_keeps_extra_fields() {
        let json = r#"{
            "id": "doc-1",
            "status": "processing",
            "filename": "handbook.pdf",
            "chunk_count": 12,
            "created_at": "2025-11-25T00:33:35Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();

        assert_eq!(doc.id, "doc-1");
        assert_eq!(doc.status, DocumentStatus::Processing);
        assert!(doc.created_at.is_some());
        assert_eq!(doc.display_name(), "handbook.pdf");
        assert_eq!(doc.fields.get("chunk_count"), Some(&serde_json::json!(12)));

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["filename"], "handbook.pdf");
        assert_eq!(back["status"], "processing");
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let doc = Document::new("doc-2", DocumentStatus::Queued);
        assert_eq!(doc.display_name(), "doc-2");
    }
}
