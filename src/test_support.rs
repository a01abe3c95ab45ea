//! In-memory fakes for the rendering capability and the REST backend
//!
//! Compiled for unit tests and behind the `test-utils` feature for
//! integration tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::api::{ApiResult, PersistenceApi, PersistenceError};
use crate::document::{
    DocumentHandle, DocumentLoader, DocumentSource, RasterSurface, RenderError, RenderResult,
};
use crate::error::Operation;
use crate::notes::{content_hash, Document, Note, NoteCreate, NoteId, NoteUpdate};

/// Surface size of every fake page at scale 1.0
pub const PAGE_WIDTH: u32 = 600;
pub const PAGE_HEIGHT: u32 = 800;

/// A note with fixed timestamps for assertions
pub fn sample_note(id: NoteId, page_num: u32, x_percent: f64, y_percent: f64) -> Note {
    Note {
        id,
        doc_id: "doc-1".to_string(),
        content: format!("note {}", id),
        page_num,
        x_percent,
        y_percent,
        category: String::new(),
        updated_at: chrono::NaiveDateTime::default(),
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Holds back renders of a gated `FakeDocument` until released
#[derive(Clone)]
pub struct RenderGate {
    permits: Arc<Semaphore>,
}

impl RenderGate {
    /// Let `n` pending or future renders finish
    pub fn release(&self, n: usize) {
        self.permits.add_permits(n);
    }
}

/// Document whose pages render as blank `600x800` surfaces (independent of scale)
#[derive(Default)]
pub struct FakeDocument {
    page_count: u32,
    gate: Option<Arc<Semaphore>>,
    failing: Mutex<HashSet<u32>>,
    calls: AtomicUsize,
    calls_per_page: Mutex<HashMap<u32, usize>>,
}

impl FakeDocument {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            ..Default::default()
        }
    }

    /// Make every render wait for a permit from the returned gate
    pub fn gated(mut self) -> (Self, RenderGate) {
        let permits = Arc::new(Semaphore::new(0));
        self.gate = Some(permits.clone());
        (self, RenderGate { permits })
    }

    pub fn fail_page(&self, page_num: u32) {
        self.failing.lock().insert(page_num);
    }

    pub fn heal_page(&self, page_num: u32) {
        self.failing.lock().remove(&page_num);
    }

    /// Total calls to `render_page`
    pub fn render_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn render_calls_for(&self, page_num: u32) -> usize {
        self.calls_per_page
            .lock()
            .get(&page_num)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl DocumentHandle for FakeDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn render_page(&self, page_num: u32, _scale: f32) -> RenderResult<RasterSurface> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.calls_per_page.lock().entry(page_num).or_insert(0) += 1;

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| RenderError::PageRender {
                    page: page_num,
                    reason: e.to_string(),
                })?
                .forget();
        }

        if page_num == 0 || page_num > self.page_count {
            return Err(RenderError::PageNotFound(page_num));
        }
        if self.failing.lock().contains(&page_num) {
            return Err(RenderError::PageRender {
                page: page_num,
                reason: "corrupt content stream".to_string(),
            });
        }

        Ok(RasterSurface::filled(
            PAGE_WIDTH,
            PAGE_HEIGHT,
            [255, 255, 255, 255],
        ))
    }
}

/// Loader that hands out one shared `FakeDocument`
pub struct FakeLoader {
    document: Arc<FakeDocument>,
    fail: bool,
    opened: AtomicUsize,
}

impl FakeLoader {
    pub fn new(page_count: u32) -> Self {
        Self::with_document(Arc::new(FakeDocument::new(page_count)))
    }

    pub fn with_document(document: Arc<FakeDocument>) -> Self {
        Self {
            document,
            fail: false,
            opened: AtomicUsize::new(0),
        }
    }

    /// A loader that rejects every document
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(0)
        }
    }

    pub fn document(&self) -> Arc<FakeDocument> {
        self.document.clone()
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentLoader for FakeLoader {
    async fn open(&self, source: DocumentSource) -> RenderResult<Arc<dyn DocumentHandle>> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RenderError::DocumentLoad("not a PDF".to_string()));
        }
        if let DocumentSource::Bytes(data) = &source {
            if data.is_empty() {
                return Err(RenderError::DocumentLoad("empty document".to_string()));
            }
        }
        Ok(self.document.clone())
    }
}

// ============================================================================
// Persistence
// ============================================================================

#[derive(Default)]
struct ApiState {
    documents: HashMap<String, (Document, Vec<u8>)>,
    notes: Vec<Note>,
    next_note_id: NoteId,
}

/// In-memory persistence backend with per-operation failure injection
#[derive(Default)]
pub struct InMemoryApi {
    state: Mutex<ApiState>,
    failing: Mutex<HashSet<Operation>>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a document directly, returning its metadata
    pub fn insert_document(&self, id: &str, title: &str, data: Vec<u8>) -> Document {
        let hash = content_hash(&data);
        let document = Document {
            id: id.to_string(),
            title: title.to_string(),
            file_path: format!("uploads/{}.pdf", hash),
            file_hash: hash,
            created_at: Utc::now().naive_utc(),
        };
        self.state
            .lock()
            .documents
            .insert(id.to_string(), (document.clone(), data));
        document
    }

    /// Store a note as if it had been created earlier
    pub fn insert_note(&self, note: Note) {
        let mut state = self.state.lock();
        state.next_note_id = state.next_note_id.max(note.id);
        state.notes.push(note);
    }

    /// Replace the stored file without updating its recorded hash
    pub fn corrupt_file(&self, doc_id: &str) {
        if let Some((_, data)) = self.state.lock().documents.get_mut(doc_id) {
            data.push(0);
        }
    }

    /// Notes as the backend currently holds them
    pub fn stored_notes(&self) -> Vec<Note> {
        self.state.lock().notes.clone()
    }

    pub fn fail_on(&self, operation: Operation) {
        self.failing.lock().insert(operation);
    }

    pub fn succeed_on(&self, operation: Operation) {
        self.failing.lock().remove(&operation);
    }

    fn check(&self, operation: Operation) -> ApiResult<()> {
        if self.failing.lock().contains(&operation) {
            return Err(PersistenceError::Status {
                status: 500,
                message: format!("{} failed", operation),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceApi for InMemoryApi {
    async fn list_documents(&self) -> ApiResult<Vec<Document>> {
        let state = self.state.lock();
        let mut documents: Vec<Document> =
            state.documents.values().map(|(d, _)| d.clone()).collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn get_document(&self, doc_id: &str) -> ApiResult<Document> {
        self.check(Operation::LoadDocument)?;
        self.state
            .lock()
            .documents
            .get(doc_id)
            .map(|(d, _)| d.clone())
            .ok_or_else(|| PersistenceError::NotFound("Document not found".to_string()))
    }

    async fn upload_document(&self, file_name: &str, data: Vec<u8>) -> ApiResult<Document> {
        let hash = content_hash(&data);
        let existing = self
            .state
            .lock()
            .documents
            .values()
            .find(|(d, _)| d.file_hash == hash)
            .map(|(d, _)| d.clone());
        match existing {
            Some(document) => Ok(document),
            None => {
                let id = format!("doc-{}", &hash[..8]);
                Ok(self.insert_document(&id, file_name, data))
            }
        }
    }

    async fn delete_document(&self, doc_id: &str) -> ApiResult<()> {
        let mut state = self.state.lock();
        if state.documents.remove(doc_id).is_none() {
            return Err(PersistenceError::NotFound("Document not found".to_string()));
        }
        state.notes.retain(|n| n.doc_id != doc_id);
        Ok(())
    }

    async fn fetch_document_file(&self, doc_id: &str) -> ApiResult<Vec<u8>> {
        self.check(Operation::FetchFile)?;
        self.state
            .lock()
            .documents
            .get(doc_id)
            .map(|(_, data)| data.clone())
            .ok_or_else(|| PersistenceError::NotFound("Document not found".to_string()))
    }

    async fn list_notes(&self, doc_id: &str) -> ApiResult<Vec<Note>> {
        self.check(Operation::LoadNotes)?;
        let state = self.state.lock();
        Ok(state
            .notes
            .iter()
            .filter(|n| n.doc_id == doc_id)
            .cloned()
            .collect())
    }

    async fn create_note(&self, note: &NoteCreate) -> ApiResult<Note> {
        self.check(Operation::CreateNote)?;
        let mut state = self.state.lock();
        if !state.documents.contains_key(&note.doc_id) {
            return Err(PersistenceError::NotFound("Document not found".to_string()));
        }
        state.next_note_id += 1;
        let created = Note {
            id: state.next_note_id,
            doc_id: note.doc_id.clone(),
            content: note.content.clone(),
            page_num: note.page_num,
            x_percent: note.x_percent,
            y_percent: note.y_percent,
            category: note.category.clone(),
            updated_at: Utc::now().naive_utc(),
        };
        state.notes.push(created.clone());
        Ok(created)
    }

    async fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> ApiResult<Note> {
        self.check(Operation::UpdateNote)?;
        let mut state = self.state.lock();
        let note = state
            .notes
            .iter_mut()
            .find(|n| n.id == note_id)
            .ok_or_else(|| PersistenceError::NotFound("Note not found".to_string()))?;
        note.apply(update);
        note.updated_at = Utc::now().naive_utc();
        Ok(note.clone())
    }

    async fn delete_note(&self, note_id: NoteId) -> ApiResult<()> {
        self.check(Operation::DeleteNote)?;
        let mut state = self.state.lock();
        let before = state.notes.len();
        state.notes.retain(|n| n.id != note_id);
        if state.notes.len() == before {
            return Err(PersistenceError::NotFound("Note not found".to_string()));
        }
        Ok(())
    }
}
