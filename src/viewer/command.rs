//! Messages emitted by the viewer controller

use serde::{Deserialize, Serialize};

use crate::notes::{Anchor, NoteId};

/// A click on a rendered page, mapped to percent coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorRequest {
    pub page_num: u32,
    pub x_percent: f64,
    pub y_percent: f64,
}

impl AnchorRequest {
    pub fn anchor(&self) -> Anchor {
        Anchor::new(self.page_num, self.x_percent, self.y_percent)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAlign {
    #[default]
    Center,
    Start,
}

/// Where the presentation layer should scroll to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollTarget {
    pub page_num: u32,
    pub note_id: Option<NoteId>,
    /// Offset within the page surface, in pixels
    pub x_px: f64,
    pub y_px: f64,
    pub surface_width: u32,
    pub surface_height: u32,
    pub align: ScrollAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewerCommand {
    /// Create a note at this anchor
    CreateAnchor(AnchorRequest),
    /// Bring this position into view
    ScrollIntoView(ScrollTarget),
}
