//! Rendering capability traits
//!
//! The engine behind these traits (MuPDF, pdfium, a test fake) is configured
//! once when its loader is built and never reached from anywhere else.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::RenderResult;
use super::types::{DocumentSource, RasterSurface};

/// Opens documents for rendering
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Decode a document and return a handle for page rendering
    async fn open(&self, source: DocumentSource) -> RenderResult<Arc<dyn DocumentHandle>>;
}

/// An opened document
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Number of pages (pages are numbered from 1)
    fn page_count(&self) -> u32;

    /// Render a page at the given scale into a raster surface
    async fn render_page(&self, page_num: u32, scale: f32) -> RenderResult<RasterSurface>;
}
