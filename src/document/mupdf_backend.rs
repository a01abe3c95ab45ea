//! MuPDF rendering backend
//!
//! MuPDF documents are not thread-safe. `MupdfDocument` keeps the source bytes
//! and opens a fresh document for each render inside `spawn_blocking`,
//! serialized by a `parking_lot::Mutex`.

use std::sync::Arc;

use async_trait::async_trait;
use mupdf::{Colorspace, Matrix};
use parking_lot::Mutex;

use super::error::{RenderError, RenderResult};
use super::traits::{DocumentHandle, DocumentLoader};
use super::types::{DocumentSource, RasterSurface};

const PDF_MIME: &str = "application/pdf";

/// Scale bounds accepted by the renderer
const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 4.0;

/// Opens PDF documents with MuPDF
#[derive(Debug, Clone, Default)]
pub struct MupdfLoader;

impl MupdfLoader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentLoader for MupdfLoader {
    async fn open(&self, source: DocumentSource) -> RenderResult<Arc<dyn DocumentHandle>> {
        let data = match source {
            DocumentSource::Bytes(data) => data,
            DocumentSource::Path(path) => Arc::new(tokio::fs::read(&path).await?),
        };

        let doc = tokio::task::spawn_blocking(move || MupdfDocument::from_bytes(data))
            .await
            .map_err(|e| RenderError::DocumentLoad(format!("Task join error: {}", e)))??;

        tracing::debug!(pages = doc.page_count, "Opened PDF with MuPDF");
        Ok(Arc::new(doc))
    }
}

/// An opened PDF document
pub struct MupdfDocument {
    data: Arc<Vec<u8>>,
    page_count: u32,
    lock: Arc<Mutex<()>>,
}

impl MupdfDocument {
    /// Validate the bytes open as a PDF and read the page count
    pub fn from_bytes(data: Arc<Vec<u8>>) -> RenderResult<Self> {
        let doc = mupdf::Document::from_bytes(&data, PDF_MIME)
            .map_err(|e| RenderError::DocumentLoad(e.to_string()))?;
        let page_count = doc
            .page_count()
            .map_err(|e| RenderError::DocumentLoad(e.to_string()))?;

        Ok(Self {
            data,
            page_count: page_count.max(0) as u32,
            lock: Arc::new(Mutex::new(())),
        })
    }
}

#[async_trait]
impl DocumentHandle for MupdfDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn render_page(&self, page_num: u32, scale: f32) -> RenderResult<RasterSurface> {
        if page_num == 0 || page_num > self.page_count {
            return Err(RenderError::PageNotFound(page_num));
        }

        let data = self.data.clone();
        let lock = self.lock.clone();
        let scale = scale.clamp(MIN_SCALE, MAX_SCALE);

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock();
            render_with_mupdf(&data, page_num, scale)
        })
        .await
        .map_err(|e| RenderError::PageRender {
            page: page_num,
            reason: format!("Task join error: {}", e),
        })?
    }
}

fn render_with_mupdf(data: &[u8], page_num: u32, scale: f32) -> RenderResult<RasterSurface> {
    let page_error = |e: mupdf::Error| RenderError::PageRender {
        page: page_num,
        reason: e.to_string(),
    };

    let doc = mupdf::Document::from_bytes(data, PDF_MIME).map_err(page_error)?;
    let page = doc.load_page(page_num as i32 - 1).map_err(page_error)?;

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page
        .to_pixmap(&matrix, &colorspace, true, true)
        .map_err(page_error)?;

    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    // Normalize to RGBA
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(0);
            let b = samples.get(offset + 2).copied().unwrap_or(0);
            let a = if n >= 4 {
                samples.get(offset + 3).copied().unwrap_or(255)
            } else {
                255
            };
            rgba.extend_from_slice(&[r, g, b, a]);
        }
    }

    RasterSurface::new(width, height, rgba)
}
