//! REST persistence backend
//!
//! The editor never keeps a local copy of its own: every note change goes
//! through `PersistenceApi` and only the server's answer is applied.
//!
//! - `PersistenceApi`: async trait the session depends on
//! - `RestClient`: reqwest implementation against the AnchorMind HTTP API

mod client;
mod error;
mod traits;

pub use client::RestClient;
pub use error::{ApiResult, PersistenceError};
pub use traits::PersistenceApi;
