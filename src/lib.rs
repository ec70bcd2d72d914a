//! Framecut non-linear video editing core.
//!
//! Implements the timeline composition model with transactional undo/redo,
//! the caption/transcription subsystem, and the export rendering pipeline.
//! Decoding, transcription and frame rendering/encoding are delegated to
//! external collaborators behind async traits; this crate does the
//! bookkeeping and validation.

pub mod core;
