//! Document and note types
//!
//! Field names match the AnchorMind REST backend's JSON. Timestamps are naive
//! UTC, as the backend stores them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::AnchorError;

/// Note identifier assigned by the backend
pub type NoteId = i64;

/// An uploaded PDF document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier (UUID string)
    pub id: String,
    /// Original file name
    pub title: String,
    /// SHA-256 of the file content (hex)
    pub file_hash: String,
    /// Storage path on the server
    pub file_path: String,
    /// Upload timestamp (UTC)
    pub created_at: NaiveDateTime,
}

impl Document {
    pub fn created_at_utc(&self) -> DateTime<Utc> {
        self.created_at.and_utc()
    }

    /// Check downloaded bytes against the recorded content hash
    pub fn matches_content(&self, data: &[u8]) -> bool {
        content_hash(data).eq_ignore_ascii_case(&self.file_hash)
    }
}

/// SHA-256 hex digest, as the backend computes `file_hash`
pub fn content_hash(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Location of a note on a page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Horizontal position as percent of page width (0-100)
    pub x_percent: f64,
    /// Vertical position as percent of page height (0-100)
    pub y_percent: f64,
}

impl Anchor {
    pub fn new(page_num: u32, x_percent: f64, y_percent: f64) -> Self {
        Self {
            page_num,
            x_percent,
            y_percent,
        }
    }

    /// Check the anchor points into a document with `page_count` pages
    pub fn validate(&self, page_count: u32) -> Result<(), AnchorError> {
        if self.page_num == 0 || self.page_num > page_count {
            return Err(AnchorError::PageOutOfRange {
                page: self.page_num,
                page_count,
            });
        }
        for value in [self.x_percent, self.y_percent] {
            if !(0.0..=100.0).contains(&value) {
                return Err(AnchorError::CoordinateOutOfRange(value));
            }
        }
        Ok(())
    }
}

/// A note anchored to a document page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub doc_id: String,
    /// Markdown content
    #[serde(default)]
    pub content: String,
    pub page_num: u32,
    pub x_percent: f64,
    pub y_percent: f64,
    /// Free-form category label (e.g. "序論", "手法", "結果")
    #[serde(default)]
    pub category: String,
    pub updated_at: NaiveDateTime,
}

impl Note {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.page_num, self.x_percent, self.y_percent)
    }

    /// Note has no content yet (freshly placed)
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// First `max_chars` characters of the content, for marker tooltips
    pub fn preview(&self, max_chars: usize) -> &str {
        match self.content.char_indices().nth(max_chars) {
            Some((end, _)) => &self.content[..end],
            None => &self.content,
        }
    }

    /// Apply a partial update locally
    pub fn apply(&mut self, update: &NoteUpdate) {
        if let Some(content) = &update.content {
            self.content = content.clone();
        }
        if let Some(category) = &update.category {
            self.category = category.clone();
        }
    }
}

/// Request body for creating a note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteCreate {
    pub doc_id: String,
    pub content: String,
    pub page_num: u32,
    pub x_percent: f64,
    pub y_percent: f64,
    pub category: String,
}

impl NoteCreate {
    /// An empty note at the given anchor
    pub fn at(doc_id: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            doc_id: doc_id.into(),
            content: String::new(),
            page_num: anchor.page_num,
            x_percent: anchor.x_percent,
            y_percent: anchor.y_percent,
            category: String::new(),
        }
    }
}

/// Partial note update; anchors cannot change once created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoteUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl NoteUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            category: None,
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            content: None,
            category: Some(category.into()),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.category.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_note() -> Note {
        Note {
            id: 7,
            doc_id: "doc-1".to_string(),
            content: "## 要約\nこの論文は".to_string(),
            page_num: 2,
            x_percent: 25.0,
            y_percent: 37.5,
            category: "序論".to_string(),
            updated_at: NaiveDateTime::default(),
        }
    }

    #[test]
    fn test_note_from_backend_json() {
        let json = r#"{
            "id": 12,
            "doc_id": "0b6f1c0e-8a51-4c43-9f0a-1f4b2b7f9f10",
            "content": "",
            "page_num": 3,
            "x_percent": 42.5,
            "y_percent": 10.0,
            "category": "",
            "updated_at": "2024-05-01T10:15:30.123456"
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.id, 12);
        assert_eq!(note.anchor(), Anchor::new(3, 42.5, 10.0));
        assert!(note.is_empty());
    }

    #[test]
    fn test_document_from_backend_json() {
        let json = r#"{
            "id": "abc",
            "title": "paper.pdf",
            "file_hash": "deadbeef",
            "file_path": "uploads/deadbeef.pdf",
            "created_at": "2024-05-01T10:15:30",
            "notes": []
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.title, "paper.pdf");
        assert_eq!(doc.created_at_utc().to_rfc3339(), "2024-05-01T10:15:30+00:00");
    }

    #[test]
    fn test_content_hash() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_anchor_validation() {
        assert!(Anchor::new(1, 0.0, 100.0).validate(5).is_ok());
        assert_eq!(
            Anchor::new(6, 10.0, 10.0).validate(5),
            Err(AnchorError::PageOutOfRange {
                page: 6,
                page_count: 5
            })
        );
        assert!(Anchor::new(0, 10.0, 10.0).validate(5).is_err());
        assert_eq!(
            Anchor::new(2, 100.5, 10.0).validate(5),
            Err(AnchorError::CoordinateOutOfRange(100.5))
        );
        assert!(Anchor::new(2, 10.0, f64::NAN).validate(5).is_err());
    }

    #[test]
    fn test_preview_counts_characters() {
        let note = sample_note();
        assert_eq!(note.preview(5), "## 要約");
        assert_eq!(note.preview(100), note.content);
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let json = serde_json::to_string(&NoteUpdate::category("序論")).unwrap();
        assert_eq!(json, r#"{"category":"序論"}"#);

        let mut note = sample_note();
        note.apply(&NoteUpdate::category("手法"));
        assert_eq!(note.category, "手法");
        assert_eq!(note.content, "## 要約\nこの論文は");
    }

    #[test]
    fn test_note_create_at_anchor() {
        let create = NoteCreate::at("doc-1", Anchor::new(1, 25.0, 37.5));
        assert_eq!(create.page_num, 1);
        assert!(create.content.is_empty());
        assert!(create.category.is_empty());
    }
}
