//! Rendering error types

use thiserror::Error;

/// Errors from the rendering capability
#[derive(Debug, Error)]
pub enum RenderError {
    /// Document could not be opened or decoded
    #[error("Document load error: {0}")]
    DocumentLoad(String),

    /// A page could not be rendered
    #[error("Render error on page {page}: {reason}")]
    PageRender { page: u32, reason: String },

    /// Page number outside the document
    #[error("Page not found: {0}")]
    PageNotFound(u32),

    /// Image encoding error
    #[error("Image error: {0}")]
    ImageError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for rendering operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// A page failed to render.
///
/// Cloneable so every caller sharing an in-flight render gets the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to render page {page}: {message}")]
pub struct RenderFailure {
    pub page: u32,
    pub message: String,
}

impl RenderFailure {
    pub fn new(page: u32, message: impl Into<String>) -> Self {
        Self {
            page,
            message: message.into(),
        }
    }
}
