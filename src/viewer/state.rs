//! Per-page render state

use serde::{Deserialize, Serialize};

/// Render state of one page surface
///
/// `Unrendered -> Rendering -> Rendered`, or `Rendering -> Failed`.
/// A manual retry moves `Failed` back to `Rendering`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PageState {
    #[default]
    Unrendered,
    Rendering,
    Rendered { width: u32, height: u32 },
    Failed { reason: String },
}

impl PageState {
    pub fn is_rendered(&self) -> bool {
        matches!(self, PageState::Rendered { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PageState::Failed { .. })
    }

    /// Surface size, once rendered
    pub fn surface_size(&self) -> Option<(u32, u32)> {
        match self {
            PageState::Rendered { width, height } => Some((*width, *height)),
            _ => None,
        }
    }
}
