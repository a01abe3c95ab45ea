//! Error types for anchors and the editor session
//!
//! Rendering errors live in `document::error`, backend errors in `api::error`.
//! `SessionError` wraps both and decides what is fatal to an open session.

use std::fmt;

use thiserror::Error;

use crate::api::PersistenceError;
use crate::document::{RenderError, RenderFailure};
use crate::notes::NoteId;

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Errors in anchor placement and coordinate mapping
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnchorError {
    /// The surface has no usable size yet (clicked before it was rendered)
    #[error("Invalid surface size: {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },

    /// Page is not part of the document
    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    /// Percent coordinate outside 0-100
    #[error("Coordinate {0} is outside 0-100")]
    CoordinateOutOfRange(f64),

    /// Clicks are only accepted on rendered pages
    #[error("Page {0} is not rendered")]
    PageNotRendered(u32),
}

/// Backend operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadDocument,
    FetchFile,
    LoadNotes,
    CreateNote,
    UpdateNote,
    DeleteNote,
}

impl Operation {
    /// Failures while opening a session leave nothing to show
    pub fn is_initial_load(self) -> bool {
        matches!(
            self,
            Operation::LoadDocument | Operation::FetchFile | Operation::LoadNotes
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::LoadDocument => "load document",
            Operation::FetchFile => "fetch document file",
            Operation::LoadNotes => "load notes",
            Operation::CreateNote => "create note",
            Operation::UpdateNote => "update note",
            Operation::DeleteNote => "delete note",
        };
        f.write_str(name)
    }
}

/// Editor session error
#[derive(Debug, Error)]
pub enum SessionError {
    /// Document could not be opened for rendering
    #[error("Failed to load document: {0}")]
    DocumentLoad(String),

    /// Backend call failed
    #[error("Failed to {operation}: {source}")]
    Persistence {
        operation: Operation,
        #[source]
        source: PersistenceError,
    },

    /// A page failed to render
    #[error(transparent)]
    Render(#[from] RenderFailure),

    /// Invalid anchor or coordinate
    #[error(transparent)]
    Anchor(#[from] AnchorError),

    /// Note is not part of this session
    #[error("Note not found: {0}")]
    NoteNotFound(NoteId),
}

impl SessionError {
    pub fn persistence(operation: Operation, source: PersistenceError) -> Self {
        Self::Persistence { operation, source }
    }

    /// Whether the session can no longer show the document
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::DocumentLoad(_) => true,
            SessionError::Persistence { operation, .. } => operation.is_initial_load(),
            SessionError::Render(_) | SessionError::Anchor(_) | SessionError::NoteNotFound(_) => {
                false
            }
        }
    }
}

impl From<RenderError> for SessionError {
    fn from(err: RenderError) -> Self {
        SessionError::DocumentLoad(err.to_string())
    }
}
