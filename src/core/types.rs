//! Framecut Core Type Definitions
//!
//! Defines fundamental types used throughout the engine: id aliases,
//! tick-based time, frame rates and tick ranges.

use serde::{Deserialize, Serialize};
use tracing::warn;

// =============================================================================
// ID Types
// =============================================================================

/// Media asset unique identifier (ULID)
pub type AssetId = String;

/// Timeline element unique identifier (ULID)
pub type ElementId = String;

/// Track unique identifier (ULID)
pub type TrackId = String;

/// Caption cue unique identifier (ULID)
pub type CaptionId = String;

/// Caption track unique identifier (ULID)
pub type CaptionTrackId = String;

/// Operation unique identifier (ULID)
pub type OpId = String;

/// Job unique identifier (ULID)
pub type JobId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Timeline time in ticks (integer, frame-rate independent)
pub type Tick = i64;

/// Rendered frame index (integer)
pub type Frame = i64;

/// Number of ticks in one second.
///
/// 6000 divides evenly by the common frame rates (24, 25, 30, 50, 60), so
/// frame boundaries always land on whole ticks.
pub const TICKS_PER_SECOND: Tick = 6000;

/// Converts whole seconds to ticks.
pub fn seconds_to_ticks(seconds: i64) -> Tick {
    seconds * TICKS_PER_SECOND
}

/// Ratio (for frame rates)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    /// Numerator
    pub num: i32,
    /// Denominator
    pub den: i32,
}

impl Ratio {
    /// Creates a new ratio with validation
    pub fn new(num: i32, den: i32) -> Self {
        if den == 0 {
            warn!("Ratio created with zero denominator, defaulting to 1");
            return Self { num, den: 1 };
        }
        Self { num, den }
    }

    /// Converts to floating point value
    pub fn as_f64(&self) -> f64 {
        if self.den == 0 {
            return 0.0;
        }
        self.num as f64 / self.den as f64
    }
}

impl Default for Ratio {
    fn default() -> Self {
        Self { num: 30, den: 1 } // Default 30fps
    }
}

/// Number of frames needed to cover `ticks` of timeline at the given rate.
///
/// Rounds up: a timeline that ends partway through a frame still renders
/// that final frame.
pub fn ticks_to_frames(ticks: Tick, fps: &Ratio) -> Frame {
    if ticks <= 0 || fps.num <= 0 || fps.den <= 0 {
        return 0;
    }
    let numer = ticks as i128 * fps.num as i128;
    let denom = TICKS_PER_SECOND as i128 * fps.den as i128;
    ((numer + denom - 1) / denom) as Frame
}

/// Timeline tick at which the given frame starts.
pub fn frame_to_ticks(frame: Frame, fps: &Ratio) -> Tick {
    if frame <= 0 || fps.num <= 0 || fps.den <= 0 {
        return 0;
    }
    let numer = frame as i128 * TICKS_PER_SECOND as i128 * fps.den as i128;
    (numer / fps.num as i128) as Tick
}

// =============================================================================
// Tick Range
// =============================================================================

/// Half-open tick range `[start_tick, end_tick)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRange {
    pub start_tick: Tick,
    pub end_tick: Tick,
}

impl TickRange {
    pub fn new(start_tick: Tick, end_tick: Tick) -> Self {
        if start_tick > end_tick {
            warn!(
                "TickRange created with start > end ({} > {}), swapping",
                start_tick, end_tick
            );
            return Self {
                start_tick: end_tick,
                end_tick: start_tick,
            };
        }
        Self {
            start_tick,
            end_tick,
        }
    }

    /// Returns the covered duration in ticks
    pub fn duration(&self) -> Tick {
        self.end_tick - self.start_tick
    }

    /// Checks if a given tick falls within the range (half-open)
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.start_tick && tick < self.end_tick
    }

    /// Checks if two half-open ranges overlap
    pub fn overlaps(&self, other: &TickRange) -> bool {
        self.start_tick < other.end_tick && self.end_tick > other.start_tick
    }
}

// =============================================================================
// Tests
// =============================================================================
