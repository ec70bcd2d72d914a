//! Render Module
//!
//! Export pipeline: walks a timeline snapshot frame by frame and drives the
//! external render/encode collaborator.

mod export;

pub use export::*;
