//! Document rendering
//!
//! Format-agnostic rendering capability plus the per-session page cache.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  PageRenderCache                        │
//! │  (single-flight, never evicts within a session)        │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!   ┌─────────────────────────────────────────────────────┐
//!   │           DocumentHandle (trait object)              │
//!   │  MupdfDocument (feature "mupdf") / test fakes        │
//!   └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use anchormind::document::{DocumentLoader, DocumentSource, PageRenderCache};
//!
//! let handle = loader.open(DocumentSource::from_bytes(bytes)).await?;
//! let cache = PageRenderCache::new("doc-123", handle);
//!
//! // First call renders, later calls are served from memory
//! let page = cache.ensure_rendered(1, 1.5).await?;
//! println!("{}x{}", page.surface.width, page.surface.height);
//! ```

mod cache;
mod error;
#[cfg(feature = "mupdf")]
mod mupdf_backend;
mod traits;
mod types;

pub use cache::{CacheStats, PageCacheKey, PageRenderCache, RenderedPage, ThumbnailOutcome};
pub use error::{RenderError, RenderFailure, RenderResult};
#[cfg(feature = "mupdf")]
pub use mupdf_backend::{MupdfDocument, MupdfLoader};
pub use traits::{DocumentHandle, DocumentLoader};
pub use types::{DocumentSource, RasterSurface};
