//! Framecut Core Engine
//!
//! Core editing engine module.
//! Handles the timeline, edit history, assets, captions and export rendering.

pub mod assets;
pub mod captions;
pub mod commands;
pub mod render;
pub mod timeline;

mod session;
pub use session::*;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;
