//! Framecut Error Definitions
//!
//! Defines error types used throughout the engine.

use thiserror::Error;

use super::{AssetId, CaptionTrackId, ElementId, JobId, Tick, TrackId};

/// Core engine error types
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Asset Errors
    // =========================================================================
    #[error("Asset not found or not ready: {0}")]
    AssetNotFound(AssetId),

    #[error("Asset load failed: {0}")]
    AssetLoadFailed(String),

    // =========================================================================
    // Timeline Errors
    // =========================================================================
    #[error("Element not found: {0}")]
    ElementNotFound(ElementId),

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Caption track not found: {0}")]
    CaptionTrackNotFound(CaptionTrackId),

    #[error(
        "Element overlap on track {track_id}: ticks {new_start}~{new_end} conflict with element {existing_element_id}"
    )]
    ElementOverlap {
        track_id: TrackId,
        existing_element_id: ElementId,
        new_start: Tick,
        new_end: Tick,
    },

    #[error("Invalid tick range: {0}~{1}")]
    InvalidRange(Tick, Tick),

    #[error("Invalid split point: tick {0}")]
    InvalidSplitPoint(Tick),

    #[error("Invalid track order: {0}")]
    InvalidTrackOrder(String),

    // =========================================================================
    // Command Errors
    // =========================================================================
    #[error("Transaction already in progress")]
    TransactionInProgress,

    #[error("No active transaction")]
    NoActiveTransaction,

    // =========================================================================
    // Job Errors
    // =========================================================================
    #[error("A transcription job is already active for asset: {0}")]
    JobAlreadyActive(AssetId),

    #[error("Job not found: {0}")]
    JobNotFound(JobId),

    // =========================================================================
    // General Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Core engine result type
pub type CoreResult<T> = Result<T, CoreError>;
