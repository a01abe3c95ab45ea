//! Viewer controller
//!
//! Owns the per-page render states, the current page and the selection.
//! Rendering goes through the session's `PageRenderCache`, so a page shown
//! in the viewer and requested by `scroll_to_note` at the same time is only
//! rendered once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};

use super::command::{AnchorRequest, ScrollAlign, ScrollTarget, ViewerCommand};
use super::state::PageState;
use crate::coords;
use crate::document::{PageRenderCache, RenderFailure, RenderedPage};
use crate::error::{AnchorError, SessionResult};
use crate::notes::Note;

// ============================================================================
// Controller
// ============================================================================

/// Page viewer state and navigation
#[derive(Clone)]
pub struct ViewerController {
    inner: Arc<ViewerInner>,
}

struct ViewerInner {
    cache: PageRenderCache,
    render_scale: f32,
    pages: Mutex<HashMap<u32, PageState>>,
    current_page: watch::Sender<u32>,
    selected: watch::Sender<Option<Note>>,
    commands: mpsc::UnboundedSender<ViewerCommand>,
}

impl ViewerController {
    /// Create a controller and the receiving end of its command channel
    pub fn new(
        cache: PageRenderCache,
        render_scale: f32,
    ) -> (Self, mpsc::UnboundedReceiver<ViewerCommand>) {
        let (commands, rx) = mpsc::unbounded_channel();
        let (current_page, _) = watch::channel(1);
        let (selected, _) = watch::channel(None);

        let controller = Self {
            inner: Arc::new(ViewerInner {
                cache,
                render_scale,
                pages: Mutex::new(HashMap::new()),
                current_page,
                selected,
                commands,
            }),
        };
        (controller, rx)
    }

    pub fn page_count(&self) -> u32 {
        self.inner.cache.page_count()
    }

    pub fn render_scale(&self) -> f32 {
        self.inner.render_scale
    }

    // ========================================================================
    // Page rendering
    // ========================================================================

    pub fn page_state(&self, page_num: u32) -> PageState {
        self.inner
            .pages
            .lock()
            .get(&page_num)
            .cloned()
            .unwrap_or_default()
    }

    /// Render a page at the viewer scale, tracking its state
    ///
    /// A page that is already rendered is served from the cache; a page that
    /// is rendering is joined.
    pub async fn render_page(&self, page_num: u32) -> Result<Arc<RenderedPage>, RenderFailure> {
        let page_count = self.page_count();
        if page_num == 0 || page_num > page_count {
            return Err(RenderFailure::new(
                page_num,
                format!("page does not exist (document has {} pages)", page_count),
            ));
        }

        {
            let mut pages = self.inner.pages.lock();
            let state = pages.entry(page_num).or_default();
            if !state.is_rendered() {
                *state = PageState::Rendering;
            }
        }

        let result = self
            .inner
            .cache
            .ensure_rendered(page_num, self.inner.render_scale)
            .await;

        let state = match &result {
            Ok(page) => PageState::Rendered {
                width: page.surface.width,
                height: page.surface.height,
            },
            Err(e) => PageState::Failed {
                reason: e.message.clone(),
            },
        };
        self.inner.pages.lock().insert(page_num, state);

        result
    }

    /// Re-render a page after a failure
    pub async fn retry_page(&self, page_num: u32) -> Result<Arc<RenderedPage>, RenderFailure> {
        tracing::info!(
            doc_id = %self.inner.cache.doc_id(),
            page = page_num,
            previous = ?self.page_state(page_num),
            "Retrying page render"
        );
        self.render_page(page_num).await
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    pub fn current_page(&self) -> u32 {
        *self.inner.current_page.borrow()
    }

    pub fn subscribe_current_page(&self) -> watch::Receiver<u32> {
        self.inner.current_page.subscribe()
    }

    pub fn go_to_page(&self, page_num: u32) -> Result<(), AnchorError> {
        let page_count = self.page_count();
        if page_num == 0 || page_num > page_count {
            return Err(AnchorError::PageOutOfRange {
                page: page_num,
                page_count,
            });
        }
        self.inner.current_page.send_replace(page_num);
        Ok(())
    }

    /// Map a click on a rendered page to an anchor request
    ///
    /// The note collection is left untouched; the request is sent to whoever
    /// drains the command channel.
    pub fn on_page_surface_click(
        &self,
        page_num: u32,
        pixel_x: f64,
        pixel_y: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> Result<AnchorRequest, AnchorError> {
        let request =
            self.anchor_for_click(page_num, pixel_x, pixel_y, surface_width, surface_height)?;
        self.emit(ViewerCommand::CreateAnchor(request));
        Ok(request)
    }

    /// Map a click without queueing a command
    pub fn anchor_for_click(
        &self,
        page_num: u32,
        pixel_x: f64,
        pixel_y: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> Result<AnchorRequest, AnchorError> {
        if !self.page_state(page_num).is_rendered() {
            return Err(AnchorError::PageNotRendered(page_num));
        }

        let point = coords::to_percent(pixel_x, pixel_y, surface_width, surface_height)?;
        let request = AnchorRequest {
            page_num,
            x_percent: point.x_percent,
            y_percent: point.y_percent,
        };

        tracing::debug!(
            page = page_num,
            x_percent = request.x_percent,
            y_percent = request.y_percent,
            "Anchor requested"
        );
        Ok(request)
    }

    /// Navigate to a note and request a scroll centred on its anchor
    ///
    /// The scroll target is computed from the rendered surface, so it is only
    /// emitted after the page render has completed.
    pub async fn scroll_to_note(&self, note: &Note) -> SessionResult<ScrollTarget> {
        let target = self.scroll_target(note).await?;
        self.emit(ViewerCommand::ScrollIntoView(target.clone()));
        Ok(target)
    }

    /// Navigate to a note and compute its scroll target without queueing a command
    pub async fn scroll_target(&self, note: &Note) -> SessionResult<ScrollTarget> {
        self.go_to_page(note.page_num)?;

        let page = self.render_page(note.page_num).await?;
        let (width, height) = (page.surface.width, page.surface.height);
        let offset = coords::to_pixel(note.x_percent, note.y_percent, width as f64, height as f64)?;

        let target = ScrollTarget {
            page_num: note.page_num,
            note_id: Some(note.id),
            x_px: offset.x,
            y_px: offset.y,
            surface_width: width,
            surface_height: height,
            align: ScrollAlign::Center,
        };

        tracing::debug!(
            note_id = note.id,
            page = note.page_num,
            y_px = target.y_px,
            "Scrolling to note"
        );
        Ok(target)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn selected(&self) -> Option<Note> {
        self.inner.selected.borrow().clone()
    }

    pub fn subscribe_selection(&self) -> watch::Receiver<Option<Note>> {
        self.inner.selected.subscribe()
    }

    pub fn select_note(&self, note: Note) {
        self.inner.selected.send_replace(Some(note));
    }

    pub fn clear_selection(&self) {
        self.inner.selected.send_replace(None);
    }

    /// Replace the selected note with a newer version of itself
    ///
    /// Does nothing when a different note (or none) is selected.
    pub fn refresh_selection(&self, note: &Note) {
        self.inner.selected.send_if_modified(|selected| match selected {
            Some(current) if current.id == note.id => {
                *current = note.clone();
                true
            }
            _ => false,
        });
    }

    fn emit(&self, command: ViewerCommand) {
        if self.inner.commands.send(command).is_err() {
            tracing::warn!("Viewer command dropped: receiver closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::test_support::{sample_note, FakeDocument};
    use tokio::sync::mpsc::error::TryRecvError;

    fn controller_for(
        doc: &Arc<FakeDocument>,
    ) -> (ViewerController, mpsc::UnboundedReceiver<ViewerCommand>) {
        ViewerController::new(PageRenderCache::new("doc-1", doc.clone()), 1.5)
    }

    #[tokio::test]
    async fn test_page_state_transitions() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, _rx) = controller_for(&doc);

        assert_eq!(viewer.page_state(1), PageState::Unrendered);
        viewer.render_page(1).await.unwrap();
        assert_eq!(
            viewer.page_state(1),
            PageState::Rendered {
                width: 600,
                height: 800
            }
        );
    }

    #[tokio::test]
    async fn test_failed_page_can_be_retried() {
        let doc = Arc::new(FakeDocument::new(5));
        doc.fail_page(2);
        let (viewer, _rx) = controller_for(&doc);

        viewer.render_page(1).await.unwrap();
        assert!(viewer.render_page(2).await.is_err());
        assert!(viewer.page_state(2).is_failed());
        assert!(viewer.page_state(1).is_rendered());

        doc.heal_page(2);
        viewer.retry_page(2).await.unwrap();
        assert!(viewer.page_state(2).is_rendered());
    }

    #[tokio::test]
    async fn test_click_requires_rendered_page() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, mut rx) = controller_for(&doc);

        assert_eq!(
            viewer.on_page_surface_click(1, 150.0, 300.0, 600.0, 800.0),
            Err(AnchorError::PageNotRendered(1))
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_click_emits_anchor_request() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, mut rx) = controller_for(&doc);
        viewer.render_page(1).await.unwrap();

        let request = viewer
            .on_page_surface_click(1, 150.0, 300.0, 600.0, 800.0)
            .unwrap();
        assert_eq!(request.page_num, 1);
        assert_eq!(request.x_percent, 25.0);
        assert_eq!(request.y_percent, 37.5);

        assert_eq!(rx.try_recv().unwrap(), ViewerCommand::CreateAnchor(request));
    }

    #[tokio::test]
    async fn test_click_on_zero_size_surface() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, _rx) = controller_for(&doc);
        viewer.render_page(1).await.unwrap();

        assert!(matches!(
            viewer.on_page_surface_click(1, 10.0, 10.0, 0.0, 0.0),
            Err(AnchorError::InvalidSurface { .. })
        ));
    }

    #[tokio::test]
    async fn test_scroll_waits_for_slow_render() {
        let (doc, gate) = FakeDocument::new(5).gated();
        let doc = Arc::new(doc);
        let (viewer, mut rx) = controller_for(&doc);
        let note = sample_note(7, 3, 25.0, 37.5);

        let (target, _) = tokio::join!(viewer.scroll_to_note(&note), async {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            assert_eq!(viewer.current_page(), 3);
            assert_eq!(viewer.page_state(3), PageState::Rendering);
            assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
            gate.release(1);
        });

        let target = target.unwrap();
        assert_eq!(target.note_id, Some(7));
        assert_eq!(target.align, ScrollAlign::Center);
        assert!((target.x_px - 150.0).abs() < 1e-9);
        assert!((target.y_px - 300.0).abs() < 1e-9);
        assert_eq!(rx.try_recv().unwrap(), ViewerCommand::ScrollIntoView(target));
        assert_eq!(doc.render_calls_for(3), 1);
    }

    #[tokio::test]
    async fn test_scroll_to_failed_page_emits_nothing() {
        let doc = Arc::new(FakeDocument::new(5));
        doc.fail_page(4);
        let (viewer, mut rx) = controller_for(&doc);

        let err = viewer
            .scroll_to_note(&sample_note(1, 4, 10.0, 10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Render(RenderFailure { page: 4, .. })));
        assert!(rx.try_recv().is_err());
        assert!(viewer.page_state(4).is_failed());
    }

    #[tokio::test]
    async fn test_render_out_of_range_leaves_no_state() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, _rx) = controller_for(&doc);

        assert_eq!(viewer.render_page(0).await.unwrap_err().page, 0);
        assert_eq!(viewer.render_page(6).await.unwrap_err().page, 6);

        assert!(viewer.inner.pages.lock().is_empty());
        assert_eq!(viewer.page_state(6), PageState::Unrendered);
        assert_eq!(doc.render_calls(), 0);
    }

    #[tokio::test]
    async fn test_non_emitting_variants_queue_nothing() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, mut rx) = controller_for(&doc);
        viewer.render_page(1).await.unwrap();

        let request = viewer
            .anchor_for_click(1, 150.0, 300.0, 600.0, 800.0)
            .unwrap();
        assert_eq!((request.x_percent, request.y_percent), (25.0, 37.5));

        let target = viewer
            .scroll_target(&sample_note(3, 2, 50.0, 50.0))
            .await
            .unwrap();
        assert_eq!(target.page_num, 2);
        assert_eq!(viewer.current_page(), 2);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_go_to_page_bounds() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, _rx) = controller_for(&doc);
        let mut pages = viewer.subscribe_current_page();

        assert_eq!(viewer.current_page(), 1);
        viewer.go_to_page(5).unwrap();
        assert!(pages.has_changed().unwrap());
        assert_eq!(*pages.borrow_and_update(), 5);
        assert!(viewer.go_to_page(0).is_err());
        assert!(viewer.go_to_page(6).is_err());
        assert_eq!(viewer.current_page(), 5);
    }

    #[tokio::test]
    async fn test_selection() {
        let doc = Arc::new(FakeDocument::new(5));
        let (viewer, _rx) = controller_for(&doc);
        let note = sample_note(1, 2, 10.0, 10.0);

        viewer.select_note(note.clone());
        assert_eq!(viewer.selected().map(|n| n.id), Some(1));

        let mut newer = note.clone();
        newer.content = "updated".to_string();
        viewer.refresh_selection(&newer);
        assert_eq!(viewer.selected().unwrap().content, "updated");

        viewer.refresh_selection(&sample_note(2, 2, 10.0, 10.0));
        assert_eq!(viewer.selected().map(|n| n.id), Some(1));

        viewer.clear_selection();
        assert!(viewer.selected().is_none());
    }
}
