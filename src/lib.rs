//! AnchorMind core library
//!
//! Page rendering and spatial-anchor coordination for annotating PDF documents.
//! Notes are pinned to `(page, x%, y%)` anchors on rendered pages and persisted
//! through the AnchorMind REST backend.
//!
//! # Modules
//!
//! - `coords`: pixel <-> percent coordinate mapping
//! - `document`: rendering capability traits, raster surfaces, page render cache
//! - `notes`: note/document types, anchor index, heatmap classifier
//! - `viewer`: per-page render state, click-to-anchor, scroll-to-note
//! - `session`: the editor session tying it all together
//! - `api`: persistence trait and REST client

pub mod api;
pub mod config;
pub mod coords;
pub mod document;
pub mod error;
pub mod notes;
pub mod session;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use config::Config;
pub use error::{AnchorError, SessionError, SessionResult};
pub use session::{CommandOutcome, EditorSession, PageHeat, SessionEvent};
