//! Notes anchored to document pages
//!
//! - Types shared with the REST backend (`Document`, `Note`, `NoteCreate`, `NoteUpdate`)
//! - `AnchorIndex`: notes grouped by page, list ordering
//! - Heatmap tiers for per-page note density

mod heatmap;
mod index;
mod types;

pub use heatmap::{classify, HeatColor, HeatmapThresholds, Tier};
pub use index::{sorted_for_list, AnchorIndex};
pub use types::{content_hash, Anchor, Document, Note, NoteCreate, NoteId, NoteUpdate};
