//! Page render cache with single-flight rendering
//!
//! Renders each (page, scale) at most once per session and keeps the result
//! for the lifetime of the session. Nothing is evicted: a session only ever
//! holds one document and pages are re-shown constantly while scrolling.
//!
//! # Single-flight
//!
//! The first request for an uncached key starts the render and parks a
//! `Shared` future in `in_flight`. Later requests for the same key await that
//! future instead of rendering again. The shared future itself moves the
//! result into `entries` (on success) and clears the in-flight slot (always),
//! so a failed page is retried by the next request.
//!
//! The state lock is a `parking_lot::Mutex` and is never held across an await.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;

use super::error::RenderFailure;
use super::traits::DocumentHandle;
use super::types::RasterSurface;

type SharedRender = Shared<BoxFuture<'static, Result<Arc<RenderedPage>, RenderFailure>>>;

/// Cache key for rendered pages
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct PageCacheKey {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Scale * 100 as integer for hashing
    pub scale: u32,
}

impl PageCacheKey {
    pub fn new(page_num: u32, scale: f32) -> Self {
        Self {
            page_num,
            scale: (scale * 100.0).round() as u32,
        }
    }
}

/// A rendered page entry
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Page number (1-indexed)
    pub page_num: u32,
    /// Scale the page was rendered at
    pub scale: f32,
    /// Rendered pixels and their measured size
    pub surface: RasterSurface,
}

/// Outcome of rendering one thumbnail of the strip
#[derive(Debug, Clone)]
pub struct ThumbnailOutcome {
    pub page_num: u32,
    pub result: Result<Arc<RenderedPage>, RenderFailure>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cached page renders
    pub entries: usize,
    /// Renders currently in flight
    pub in_flight: usize,
    /// Calls made to the rendering capability
    pub renders_started: usize,
    /// Requests answered from memory
    pub hits: usize,
    /// Requests that joined an in-flight render
    pub joined: usize,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<PageCacheKey, Arc<RenderedPage>>,
    in_flight: HashMap<PageCacheKey, SharedRender>,
    renders_started: usize,
    hits: usize,
    joined: usize,
}

struct CacheInner {
    doc_id: String,
    handle: Arc<dyn DocumentHandle>,
    state: Mutex<CacheState>,
}

/// Per-session cache of rendered pages
#[derive(Clone)]
pub struct PageRenderCache {
    inner: Arc<CacheInner>,
}

impl PageRenderCache {
    /// Create an empty cache for an opened document
    pub fn new(doc_id: impl Into<String>, handle: Arc<dyn DocumentHandle>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                doc_id: doc_id.into(),
                handle,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn doc_id(&self) -> &str {
        &self.inner.doc_id
    }

    pub fn page_count(&self) -> u32 {
        self.inner.handle.page_count()
    }

    /// Return the rendered page, rendering it first if needed
    pub async fn ensure_rendered(
        &self,
        page_num: u32,
        scale: f32,
    ) -> Result<Arc<RenderedPage>, RenderFailure> {
        let page_count = self.page_count();
        if page_num == 0 || page_num > page_count {
            return Err(RenderFailure::new(
                page_num,
                format!("page does not exist (document has {} pages)", page_count),
            ));
        }

        let key = PageCacheKey::new(page_num, scale);

        let pending = {
            let mut state = self.inner.state.lock();

            if let Some(page) = state.entries.get(&key).cloned() {
                state.hits += 1;
                return Ok(page);
            }

            if let Some(pending) = state.in_flight.get(&key).cloned() {
                state.joined += 1;
                tracing::debug!(
                    doc_id = %self.inner.doc_id,
                    page = page_num,
                    "Joining in-flight render"
                );
                pending
            } else {
                let pending = Self::start_render(self.inner.clone(), key, scale);
                state.in_flight.insert(key, pending.clone());
                state.renders_started += 1;
                pending
            }
        };

        pending.await
    }

    fn start_render(inner: Arc<CacheInner>, key: PageCacheKey, scale: f32) -> SharedRender {
        async move {
            tracing::debug!(doc_id = %inner.doc_id, page = key.page_num, scale, "Rendering page");

            let outcome = match inner.handle.render_page(key.page_num, scale).await {
                Ok(surface) => Ok(Arc::new(RenderedPage {
                    page_num: key.page_num,
                    scale,
                    surface,
                })),
                Err(e) => {
                    tracing::warn!(
                        doc_id = %inner.doc_id,
                        page = key.page_num,
                        error = %e,
                        "Page render failed"
                    );
                    Err(RenderFailure::new(key.page_num, e.to_string()))
                }
            };

            let mut state = inner.state.lock();
            state.in_flight.remove(&key);
            if let Ok(page) = &outcome {
                state.entries.insert(key, page.clone());
            }

            outcome
        }
        .boxed()
        .shared()
    }

    /// Get a cached page without rendering
    pub fn get(&self, page_num: u32, scale: f32) -> Option<Arc<RenderedPage>> {
        let state = self.inner.state.lock();
        state.entries.get(&PageCacheKey::new(page_num, scale)).cloned()
    }

    /// Check if a page is cached at the given scale
    pub fn contains(&self, page_num: u32, scale: f32) -> bool {
        let state = self.inner.state.lock();
        state.entries.contains_key(&PageCacheKey::new(page_num, scale))
    }

    /// Render the thumbnail strip: pages `1..=min(page_count, limit)`, one at a time.
    ///
    /// A failing thumbnail is reported in its outcome and does not stop the strip.
    pub async fn render_thumbnails(&self, scale: f32, limit: u32) -> Vec<ThumbnailOutcome> {
        let last = self.page_count().min(limit);
        let mut outcomes = Vec::with_capacity(last as usize);

        for page_num in 1..=last {
            let result = self.ensure_rendered(page_num, scale).await;
            if let Err(e) = &result {
                tracing::warn!(page = page_num, error = %e, "Failed to render thumbnail");
            }
            outcomes.push(ThumbnailOutcome { page_num, result });
        }

        outcomes
    }

    /// Number of cached page renders
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Check if cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().entries.is_empty()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock();
        CacheStats {
            entries: state.entries.len(),
            in_flight: state.in_flight.len(),
            renders_started: state.renders_started,
            hits: state.hits,
            joined: state.joined,
        }
    }
}
