//! Editor session
//!
//! One open document with its notes. The session is the only writer of the
//! note collection and the only place that talks to the persistence backend.
//! Every change is applied after the backend confirms it; a failed call
//! leaves the session exactly as it was and is reported as a
//! `SessionEvent::Failure`.
//!
//! # Flow
//!
//! ```text
//! click on page ──► ViewerController ──CreateAnchor──► process_commands
//!                                                        │
//!                                                        ▼
//!                              PersistenceApi::create_note ──► notes + selection
//! ```

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::api::PersistenceApi;
use crate::config::{Config, ViewerConfig};
use crate::document::{
    DocumentLoader, DocumentSource, PageRenderCache, RenderedPage, ThumbnailOutcome,
};
use crate::error::{Operation, SessionError, SessionResult};
use crate::notes::{
    sorted_for_list, Anchor, AnchorIndex, Document, HeatmapThresholds, Note, NoteCreate, NoteId,
    NoteUpdate, Tier,
};
use crate::viewer::{ScrollTarget, ViewerCommand, ViewerController};

/// Note density of one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageHeat {
    pub page_num: u32,
    pub count: usize,
    pub tier: Tier,
}

/// Notifications for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    ScrollIntoView(ScrollTarget),
    NoteCreated(Note),
    NoteUpdated(Note),
    NoteDeleted(NoteId),
    Failure { message: String, fatal: bool },
}

/// Result of handling one viewer command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    NoteCreated(Note),
    Scrolled(ScrollTarget),
}

/// An open document with its notes
pub struct EditorSession {
    api: Arc<dyn PersistenceApi>,
    document: Document,
    cache: PageRenderCache,
    viewer: ViewerController,
    commands: mpsc::UnboundedReceiver<ViewerCommand>,
    notes: Vec<Note>,
    events: Vec<SessionEvent>,
    heatmap: HeatmapThresholds,
    viewer_config: ViewerConfig,
}

impl EditorSession {
    // ========================================================================
    // Opening
    // ========================================================================

    /// Load document metadata, file and notes, and open the document for rendering
    ///
    /// Every error here is fatal: without the document or its notes there is
    /// nothing to show.
    pub async fn open(
        api: Arc<dyn PersistenceApi>,
        loader: &dyn DocumentLoader,
        doc_id: &str,
        config: &Config,
    ) -> SessionResult<Self> {
        let result = Self::load(api, loader, doc_id, config).await;
        if let Err(e) = &result {
            tracing::error!(doc_id = %doc_id, error = %e, "Failed to open editor session");
        }
        result
    }

    async fn load(
        api: Arc<dyn PersistenceApi>,
        loader: &dyn DocumentLoader,
        doc_id: &str,
        config: &Config,
    ) -> SessionResult<Self> {
        let document = api
            .get_document(doc_id)
            .await
            .map_err(|e| SessionError::persistence(Operation::LoadDocument, e))?;

        let data = api
            .fetch_document_file(doc_id)
            .await
            .map_err(|e| SessionError::persistence(Operation::FetchFile, e))?;

        if !document.matches_content(&data) {
            return Err(SessionError::DocumentLoad(format!(
                "content hash mismatch for {} (expected {})",
                document.title, document.file_hash
            )));
        }

        let handle = loader.open(DocumentSource::from_bytes(data)).await?;
        let page_count = handle.page_count();

        let notes = api
            .list_notes(doc_id)
            .await
            .map_err(|e| SessionError::persistence(Operation::LoadNotes, e))?;

        for note in &notes {
            if let Err(e) = note.anchor().validate(page_count) {
                tracing::warn!(note_id = note.id, error = %e, "Loaded note has an invalid anchor");
            }
        }

        let cache = PageRenderCache::new(document.id.clone(), handle);
        let (viewer, commands) = ViewerController::new(cache.clone(), config.viewer.render_scale);

        tracing::info!(
            doc_id = %document.id,
            title = %document.title,
            pages = page_count,
            notes = notes.len(),
            "Opened editor session"
        );

        Ok(Self {
            api,
            document,
            cache,
            viewer,
            commands,
            notes,
            events: Vec::new(),
            heatmap: config.heatmap,
            viewer_config: config.viewer.clone(),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> u32 {
        self.cache.page_count()
    }

    pub fn viewer(&self) -> &ViewerController {
        &self.viewer
    }

    pub fn cache(&self) -> &PageRenderCache {
        &self.cache
    }

    // ========================================================================
    // Rendering and navigation
    // ========================================================================

    pub async fn render_page(&mut self, page_num: u32) -> SessionResult<Arc<RenderedPage>> {
        match self.viewer.render_page(page_num).await {
            Ok(page) => Ok(page),
            Err(e) => Err(self.report(e.into())),
        }
    }

    pub async fn retry_page(&mut self, page_num: u32) -> SessionResult<Arc<RenderedPage>> {
        match self.viewer.retry_page(page_num).await {
            Ok(page) => Ok(page),
            Err(e) => Err(self.report(e.into())),
        }
    }

    /// Render the thumbnail strip; failed thumbnails are reported individually
    pub async fn render_thumbnails(&mut self) -> Vec<ThumbnailOutcome> {
        let outcomes = self
            .cache
            .render_thumbnails(
                self.viewer_config.thumbnail_scale,
                self.viewer_config.thumbnail_page_limit,
            )
            .await;

        for outcome in &outcomes {
            if let Err(e) = &outcome.result {
                self.report(e.clone().into());
            }
        }
        outcomes
    }

    pub fn go_to_page(&mut self, page_num: u32) -> SessionResult<()> {
        match self.viewer.go_to_page(page_num) {
            Ok(()) => Ok(()),
            Err(e) => Err(self.report(e.into())),
        }
    }

    // ========================================================================
    // Commands from the viewer
    // ========================================================================

    /// A click on a page surface: map it and create a note there
    pub async fn handle_page_click(
        &mut self,
        page_num: u32,
        pixel_x: f64,
        pixel_y: f64,
        surface_width: f64,
        surface_height: f64,
    ) -> SessionResult<Note> {
        let clicked = self.viewer.anchor_for_click(
            page_num,
            pixel_x,
            pixel_y,
            surface_width,
            surface_height,
        );
        match clicked {
            Ok(request) => self.create_note_at(request.anchor()).await,
            Err(e) => Err(self.report(e.into())),
        }
    }

    /// Handle every queued viewer command, in order
    pub async fn process_commands(&mut self) -> Vec<SessionResult<CommandOutcome>> {
        let mut outcomes = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            let outcome = match command {
                ViewerCommand::CreateAnchor(request) => self
                    .create_note_at(request.anchor())
                    .await
                    .map(CommandOutcome::NoteCreated),
                ViewerCommand::ScrollIntoView(target) => {
                    self.events.push(SessionEvent::ScrollIntoView(target.clone()));
                    Ok(CommandOutcome::Scrolled(target))
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    // ========================================================================
    // Notes
    // ========================================================================

    /// Create an empty note at an anchor and select it
    pub async fn create_note_at(&mut self, anchor: Anchor) -> SessionResult<Note> {
        if let Err(e) = anchor.validate(self.page_count()) {
            return Err(self.report(e.into()));
        }

        let request = NoteCreate::at(self.document.id.clone(), anchor);
        match self.api.create_note(&request).await {
            Ok(note) => {
                tracing::info!(
                    note_id = note.id,
                    page = note.page_num,
                    x_percent = note.x_percent,
                    y_percent = note.y_percent,
                    "Created note"
                );
                self.notes.push(note.clone());
                self.viewer.select_note(note.clone());
                self.events.push(SessionEvent::NoteCreated(note.clone()));
                Ok(note)
            }
            Err(e) => Err(self.report(SessionError::persistence(Operation::CreateNote, e))),
        }
    }

    /// Select a note and scroll to it
    pub async fn select_note(&mut self, note_id: NoteId) -> SessionResult<ScrollTarget> {
        let note = match self.find(note_id) {
            Some(note) => note.clone(),
            None => return Err(self.report(SessionError::NoteNotFound(note_id))),
        };

        self.viewer.select_note(note.clone());
        match self.viewer.scroll_target(&note).await {
            Ok(target) => {
                self.events.push(SessionEvent::ScrollIntoView(target.clone()));
                Ok(target)
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub fn clear_selection(&mut self) {
        self.viewer.clear_selection();
    }

    pub fn selected(&self) -> Option<Note> {
        self.viewer.selected()
    }

    /// Change content and/or category; the anchor stays fixed
    pub async fn update_note(
        &mut self,
        note_id: NoteId,
        update: NoteUpdate,
    ) -> SessionResult<Note> {
        if self.find(note_id).is_none() {
            return Err(self.report(SessionError::NoteNotFound(note_id)));
        }

        match self.api.update_note(note_id, &update).await {
            Ok(note) => {
                tracing::debug!(note_id, "Updated note");
                if let Some(slot) = self.notes.iter_mut().find(|n| n.id == note_id) {
                    *slot = note.clone();
                }
                self.viewer.refresh_selection(&note);
                self.events.push(SessionEvent::NoteUpdated(note.clone()));
                Ok(note)
            }
            Err(e) => Err(self.report(SessionError::persistence(Operation::UpdateNote, e))),
        }
    }

    pub async fn delete_note(&mut self, note_id: NoteId) -> SessionResult<()> {
        if self.find(note_id).is_none() {
            return Err(self.report(SessionError::NoteNotFound(note_id)));
        }

        match self.api.delete_note(note_id).await {
            Ok(()) => {
                tracing::info!(note_id, "Deleted note");
                self.notes.retain(|n| n.id != note_id);
                if self.viewer.selected().map(|n| n.id) == Some(note_id) {
                    self.viewer.clear_selection();
                }
                self.events.push(SessionEvent::NoteDeleted(note_id));
                Ok(())
            }
            Err(e) => Err(self.report(SessionError::persistence(Operation::DeleteNote, e))),
        }
    }

    fn find(&self, note_id: NoteId) -> Option<&Note> {
        self.notes.iter().find(|n| n.id == note_id)
    }

    // ========================================================================
    // Read models
    // ========================================================================

    /// Notes in the order they were loaded or created
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    /// Notes for the side list, page by page and top to bottom
    pub fn sorted_notes(&self) -> Vec<Note> {
        sorted_for_list(&self.notes)
    }

    pub fn index(&self) -> AnchorIndex {
        AnchorIndex::build(&self.notes)
    }

    pub fn notes_for_page(&self, page_num: u32) -> Vec<Note> {
        self.index().notes_for_page(page_num).to_vec()
    }

    pub fn page_heat(&self, page_num: u32) -> PageHeat {
        let count = self.notes.iter().filter(|n| n.page_num == page_num).count();
        PageHeat {
            page_num,
            count,
            tier: self.heatmap.classify(count),
        }
    }

    /// Heat of every page in the document
    pub fn heatmap(&self) -> Vec<PageHeat> {
        let index = self.index();
        (1..=self.page_count())
            .map(|page_num| {
                let count = index.count_for_page(page_num);
                PageHeat {
                    page_num,
                    count,
                    tier: self.heatmap.classify(count),
                }
            })
            .collect()
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Drain pending notifications
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn report(&mut self, err: SessionError) -> SessionError {
        let fatal = err.is_fatal();
        if fatal {
            tracing::error!(doc_id = %self.document.id, error = %err, "Session failure");
        } else {
            tracing::warn!(doc_id = %self.document.id, error = %err, "Operation failed");
        }
        self.events.push(SessionEvent::Failure {
            message: err.to_string(),
            fatal,
        });
        err
    }
}
