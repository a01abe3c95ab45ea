//! Viewer controller
//!
//! Tracks the render state of every page surface, turns clicks on rendered
//! pages into anchor requests and sequences scroll-to-note after the target
//! page has rendered. Requests for other components leave through a
//! `ViewerCommand` channel.

mod command;
mod controller;
mod state;

pub use command::{AnchorRequest, ScrollAlign, ScrollTarget, ViewerCommand};
pub use controller::ViewerController;
pub use state::PageState;
