//! HTTP client for the AnchorMind REST API

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiResult, PersistenceError};
use super::traits::PersistenceApi;
use crate::config::ApiConfig;
use crate::notes::{Document, Note, NoteCreate, NoteId, NoteUpdate};

const PDF_MIME: &str = "application/pdf";

/// REST persistence client
#[derive(Debug, Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Upload a PDF from disk, using its file name as the title
    pub async fn upload_file(&self, path: impl AsRef<Path>) -> ApiResult<Document> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                PersistenceError::InvalidUpload(format!("No file name in {}", path.display()))
            })?
            .to_string();

        let data = tokio::fs::read(path).await?;
        self.upload_document(&file_name, data).await
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let response = Self::check(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Map non-success statuses, reading the `detail` field of error bodies
    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_detail(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });

        if status == StatusCode::NOT_FOUND {
            Err(PersistenceError::NotFound(message))
        } else {
            Err(PersistenceError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }
}

fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_pdf(file_name: &str) -> bool {
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str() == PDF_MIME)
        .unwrap_or(false)
}

#[async_trait]
impl PersistenceApi for RestClient {
    async fn list_documents(&self) -> ApiResult<Vec<Document>> {
        let response = self.client.get(self.url("/docs")).send().await?;
        Self::parse(response).await
    }

    async fn get_document(&self, doc_id: &str) -> ApiResult<Document> {
        let url = self.url(&format!("/docs/{}", urlencoding::encode(doc_id)));
        let response = self.client.get(url).send().await?;
        Self::parse(response).await
    }

    async fn upload_document(&self, file_name: &str, data: Vec<u8>) -> ApiResult<Document> {
        if !is_pdf(file_name) {
            return Err(PersistenceError::InvalidUpload(format!(
                "{} is not a PDF",
                file_name
            )));
        }

        let size = data.len();
        let part = multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(PDF_MIME)?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/docs/upload"))
            .multipart(form)
            .send()
            .await?;
        let document: Document = Self::parse(response).await?;

        tracing::info!(
            doc_id = %document.id,
            title = %document.title,
            size,
            "Uploaded document"
        );
        Ok(document)
    }

    async fn delete_document(&self, doc_id: &str) -> ApiResult<()> {
        let url = self.url(&format!("/docs/{}", urlencoding::encode(doc_id)));
        let response = self.client.delete(url).send().await?;
        Self::check(response).await?;
        tracing::info!(doc_id = %doc_id, "Deleted document");
        Ok(())
    }

    async fn fetch_document_file(&self, doc_id: &str) -> ApiResult<Vec<u8>> {
        let url = self.url(&format!("/docs/{}/file", urlencoding::encode(doc_id)));
        let response = self.client.get(url).send().await?;
        let bytes = Self::check(response).await?.bytes().await?;
        tracing::debug!(doc_id = %doc_id, size = bytes.len(), "Fetched document file");
        Ok(bytes.to_vec())
    }

    async fn list_notes(&self, doc_id: &str) -> ApiResult<Vec<Note>> {
        let url = self.url(&format!("/docs/{}/notes", urlencoding::encode(doc_id)));
        let response = self.client.get(url).send().await?;
        Self::parse(response).await
    }

    async fn create_note(&self, note: &NoteCreate) -> ApiResult<Note> {
        let response = self
            .client
            .post(self.url("/notes"))
            .json(note)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn update_note(&self, note_id: NoteId, update: &NoteUpdate) -> ApiResult<Note> {
        let response = self
            .client
            .put(self.url(&format!("/notes/{}", note_id)))
            .json(update)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn delete_note(&self, note_id: NoteId) -> ApiResult<()> {
        let response = self
            .client
            .delete(self.url(&format!("/notes/{}", note_id)))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
