//! Persistence trait
//!
//! Implemented by `RestClient` and by the in-memory backend used in tests.

use async_trait::async_trait;

use super::error::ApiResult;
use crate::notes::{Document, Note, NoteCreate, NoteId, NoteUpdate};

/// Document and note storage
#[async_trait]
pub trait PersistenceApi: Send + Sync {
    /// All uploaded documents
    async fn list_documents(&self) -> ApiResult<Vec<Document>>;

    /// Document metadata
    async fn get_document(&self, doc_id: &str) -> ApiResult<Document>;

    /// Upload a PDF; the server deduplicates by content hash
    async fn upload_document(&self, file_name: &str, data: Vec<u8>) -> ApiResult<Document>;

    /// Delete a document and its notes
    async fn delete_document(&self, doc_id: &str) -> ApiResult<()>;

    /// Raw PDF bytes
    async fn fetch_document_file(&self, doc_id: &str) -> ApiResult<Vec<u8>>;

    /// Notes of one document, in server order
    async fn list_notes(&self, doc_id: &str) -> ApiResult<Vec<Note>>;

    async fn create_note(&self, note: &NoteCreate) -> ApiResult<Note>;

    async fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> ApiResult<Note>;

    async fn delete_note(&self, note_id: NoteId) -> ApiResult<()>;
}
