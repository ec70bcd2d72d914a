//! Caption Module
//!
//! Caption data models and the asynchronous transcription subsystem that
//! populates caption tracks from the external transcription collaborator.

mod models;
mod transcribe;

pub use models::*;
pub use transcribe::*;
