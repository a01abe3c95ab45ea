//! RestClient against an in-process fake of the AnchorMind backend

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::{json, Value};

use anchormind::api::{PersistenceApi, PersistenceError, RestClient};
use anchormind::config::ApiConfig;
use anchormind::notes::{content_hash, Document, Note, NoteCreate, NoteUpdate};
use anchormind::test_support::FakeLoader;
use anchormind::{Config, EditorSession};

const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF";

// ============================================================================
// Fake backend
// ============================================================================

#[derive(Default)]
struct BackendState {
    documents: Vec<(Document, Vec<u8>)>,
    notes: Vec<Note>,
    next_note_id: i64,
}

#[derive(Clone, Default)]
struct Backend {
    state: Arc<Mutex<BackendState>>,
}

impl Backend {
    /// Store an upload, deduplicating by content hash
    fn store(&self, title: String, data: Vec<u8>) -> Document {
        let hash = content_hash(&data);
        let mut state = self.state.lock();
        if let Some((existing, _)) = state.documents.iter().find(|(d, _)| d.file_hash == hash) {
            return existing.clone();
        }
        let doc = Document {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            file_path: format!("uploads/{}.pdf", hash),
            file_hash: hash,
            created_at: Utc::now().naive_utc(),
        };
        state.documents.push((doc.clone(), data));
        doc
    }
}

type ApiError = (StatusCode, Json<Value>);
type Reply<T> = Result<Json<T>, ApiError>;

fn error(status: StatusCode, detail: &str) -> ApiError {
    (status, Json(json!({ "detail": detail })))
}

fn doc_not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Document not found")
}

fn note_not_found() -> ApiError {
    error(StatusCode::NOT_FOUND, "Note not found")
}

async fn list_docs(State(b): State<Backend>) -> Json<Vec<Document>> {
    let state = b.state.lock();
    Json(state.documents.iter().map(|(d, _)| d.clone()).collect())
}

async fn get_doc(State(b): State<Backend>, Path(id): Path<String>) -> Reply<Document> {
    let state = b.state.lock();
    state
        .documents
        .iter()
        .find(|(d, _)| d.id == id)
        .map(|(d, _)| Json(d.clone()))
        .ok_or_else(doc_not_found)
}

async fn upload_doc(State(b): State<Backend>, mut multipart: Multipart) -> Reply<Document> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| error(StatusCode::BAD_REQUEST, &e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let title = field.file_name().unwrap_or("upload.pdf").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| error(StatusCode::BAD_REQUEST, &e.to_string()))?
            .to_vec();

        return Ok(Json(b.store(title, data)));
    }
    Err(error(StatusCode::UNPROCESSABLE_ENTITY, "file is required"))
}

async fn delete_doc(State(b): State<Backend>, Path(id): Path<String>) -> Reply<Value> {
    let mut state = b.state.lock();
    let before = state.documents.len();
    state.documents.retain(|(d, _)| d.id != id);
    if state.documents.len() == before {
        return Err(doc_not_found());
    }
    state.notes.retain(|n| n.doc_id != id);
    Ok(Json(json!({ "ok": true })))
}

async fn doc_file(State(b): State<Backend>, Path(id): Path<String>) -> Result<Vec<u8>, ApiError> {
    let state = b.state.lock();
    state
        .documents
        .iter()
        .find(|(d, _)| d.id == id)
        .map(|(_, data)| data.clone())
        .ok_or_else(doc_not_found)
}

async fn doc_notes(State(b): State<Backend>, Path(id): Path<String>) -> Reply<Vec<Note>> {
    let state = b.state.lock();
    if !state.documents.iter().any(|(d, _)| d.id == id) {
        return Err(doc_not_found());
    }
    Ok(Json(
        state.notes.iter().filter(|n| n.doc_id == id).cloned().collect(),
    ))
}

async fn create_note(State(b): State<Backend>, Json(req): Json<NoteCreate>) -> Reply<Note> {
    let mut state = b.state.lock();
    if !state.documents.iter().any(|(d, _)| d.id == req.doc_id) {
        return Err(doc_not_found());
    }
    state.next_note_id += 1;
    let note = Note {
        id: state.next_note_id,
        doc_id: req.doc_id,
        content: req.content,
        page_num: req.page_num,
        x_percent: req.x_percent,
        y_percent: req.y_percent,
        category: req.category,
        updated_at: Utc::now().naive_utc(),
    };
    state.notes.push(note.clone());
    Ok(Json(note))
}

async fn update_note(
    State(b): State<Backend>,
    Path(id): Path<i64>,
    Json(update): Json<NoteUpdate>,
) -> Reply<Note> {
    let mut state = b.state.lock();
    let note = state
        .notes
        .iter_mut()
        .find(|n| n.id == id)
        .ok_or_else(note_not_found)?;
    note.apply(&update);
    note.updated_at = Utc::now().naive_utc();
    Ok(Json(note.clone()))
}

async fn delete_note(State(b): State<Backend>, Path(id): Path<i64>) -> Reply<Value> {
    let mut state = b.state.lock();
    let before = state.notes.len();
    state.notes.retain(|n| n.id != id);
    if state.notes.len() == before {
        return Err(note_not_found());
    }
    Ok(Json(json!({ "ok": true })))
}

async fn spawn_backend() -> (RestClient, Backend) {
    let backend = Backend::default();
    let app = Router::new()
        .route("/api/docs", get(list_docs))
        .route("/api/docs/upload", post(upload_doc))
        .route("/api/docs/:id", get(get_doc).delete(delete_doc))
        .route("/api/docs/:id/file", get(doc_file))
        .route("/api/docs/:id/notes", get(doc_notes))
        .route("/api/notes", post(create_note))
        .route("/api/notes/:id", put(update_note).delete(delete_note))
        .with_state(backend.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = RestClient::new(&ApiConfig {
        base_url: format!("http://{}", addr),
        timeout_secs: 5,
    })
    .unwrap();
    (client, backend)
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_document_lifecycle() {
    let (client, _backend) = spawn_backend().await;

    let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
    std::fs::write(file.path(), PDF_BYTES).unwrap();
    let expected_title = file.path().file_name().unwrap().to_str().unwrap().to_string();

    let doc = client.upload_file(file.path()).await.unwrap();
    assert_eq!(doc.title, expected_title);
    assert_eq!(doc.file_hash, content_hash(PDF_BYTES));

    // same content is deduplicated by the server
    let again = client
        .upload_document("copy.pdf", PDF_BYTES.to_vec())
        .await
        .unwrap();
    assert_eq!(again.id, doc.id);

    let listed = client.list_documents().await.unwrap();
    assert_eq!(listed, vec![doc.clone()]);
    assert_eq!(client.get_document(&doc.id).await.unwrap(), doc);
    assert_eq!(client.fetch_document_file(&doc.id).await.unwrap(), PDF_BYTES);

    client.delete_document(&doc.id).await.unwrap();
    assert!(client.list_documents().await.unwrap().is_empty());
    assert!(client.get_document(&doc.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_not_found_detail() {
    let (client, _backend) = spawn_backend().await;

    match client.get_document("missing").await.unwrap_err() {
        PersistenceError::NotFound(message) => assert_eq!(message, "Document not found"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(client
        .update_note(42, &NoteUpdate::content("x"))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_note_crud() {
    let (client, _backend) = spawn_backend().await;
    let doc = client
        .upload_document("paper.pdf", PDF_BYTES.to_vec())
        .await
        .unwrap();

    let mut request = NoteCreate::at(doc.id.clone(), anchormind::notes::Anchor::new(2, 40.0, 60.0));
    request.content = "## 要約".to_string();
    let note = client.create_note(&request).await.unwrap();
    assert_eq!(note.page_num, 2);
    assert_eq!(note.content, "## 要約");

    let updated = client
        .update_note(note.id, &NoteUpdate::category("序論"))
        .await
        .unwrap();
    assert_eq!(updated.category, "序論");
    assert_eq!(updated.content, "## 要約");

    let notes = client.list_notes(&doc.id).await.unwrap();
    assert_eq!(notes, vec![updated]);

    client.delete_note(note.id).await.unwrap();
    assert!(client.list_notes(&doc.id).await.unwrap().is_empty());
    assert!(client.delete_note(note.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_click_to_note_end_to_end() {
    let (client, backend) = spawn_backend().await;
    let doc = client
        .upload_document("paper.pdf", PDF_BYTES.to_vec())
        .await
        .unwrap();

    let api: Arc<dyn PersistenceApi> = Arc::new(client);
    let loader = FakeLoader::new(5);
    let mut session = EditorSession::open(api, &loader, &doc.id, &Config::default())
        .await
        .unwrap();
    assert_eq!(session.page_count(), 5);

    session.render_page(1).await.unwrap();
    let note = session
        .handle_page_click(1, 150.0, 300.0, 600.0, 800.0)
        .await
        .unwrap();

    assert_eq!(note.page_num, 1);
    assert_eq!(note.x_percent, 25.0);
    assert_eq!(note.y_percent, 37.5);
    assert_eq!(session.selected().map(|n| n.id), Some(note.id));
    assert_eq!(backend.state.lock().notes, vec![note]);
}
