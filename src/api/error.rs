//! Persistence error types

use thiserror::Error;

/// Result type alias for backend calls
pub type ApiResult<T> = std::result::Result<T, PersistenceError>;

/// Errors talking to the persistence backend
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Transport failure (connection refused, timeout, bad body)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Refused locally before sending
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),
}

impl PersistenceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PersistenceError::NotFound(_))
    }
}
