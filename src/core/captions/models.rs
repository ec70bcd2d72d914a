//! Caption Data Models
//!
//! Defines caption cues and caption tracks. Cues are timeline-time indexed
//! (ticks) and non-overlapping within one caption track.

use serde::{Deserialize, Serialize};

use crate::core::{CaptionId, CaptionTrackId, CoreError, CoreResult, Tick, TickRange};

// =============================================================================
// Caption Cue
// =============================================================================

/// A single timed caption line
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub id: CaptionId,
    /// Start time on the timeline (ticks)
    pub start_tick: Tick,
    /// End time on the timeline (ticks, exclusive)
    pub end_tick: Tick,
    /// Caption text (may contain line breaks)
    pub text: String,
}

impl Caption {
    /// Creates a caption with an auto-generated id
    pub fn create(start_tick: Tick, end_tick: Tick, text: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            start_tick,
            end_tick,
            text: text.to_string(),
        }
    }

    /// Returns the covered range
    pub fn range(&self) -> TickRange {
        TickRange::new(self.start_tick, self.end_tick)
    }

    /// Returns the cue duration in ticks
    pub fn duration(&self) -> Tick {
        self.end_tick - self.start_tick
    }

    /// Returns true if the cue is visible at the given tick
    pub fn is_visible_at(&self, tick: Tick) -> bool {
        self.range().contains(tick)
    }

    /// Returns true if this cue overlaps another
    pub fn overlaps(&self, other: &Caption) -> bool {
        self.range().overlaps(&other.range())
    }
}

// =============================================================================
// Caption Track
// =============================================================================

/// A track of non-overlapping caption cues
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub id: CaptionTrackId,
    pub name: String,
    /// Language code (e.g., "en", "ko", "ja")
    pub language: String,
    /// Cues, kept sorted by start tick
    pub cues: Vec<Caption>,
}

impl CaptionTrack {
    /// Creates a new empty caption track
    pub fn new(name: &str, language: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.to_string(),
            language: language.to_string(),
            cues: vec![],
        }
    }

    /// Adds a cue, keeping cues sorted.
    ///
    /// Fails with `ValidationError` for empty/negative ranges and rejects
    /// cues overlapping an existing one.
    pub fn add_cue(&mut self, cue: Caption) -> CoreResult<()> {
        if cue.start_tick < 0 || cue.end_tick <= cue.start_tick {
            return Err(CoreError::InvalidRange(cue.start_tick, cue.end_tick));
        }
        if let Some(existing) = self.cues.iter().find(|c| c.overlaps(&cue)) {
            return Err(CoreError::ValidationError(format!(
                "caption cue {} overlaps existing cue {}",
                cue.id, existing.id
            )));
        }

        let idx = self
            .cues
            .binary_search_by(|c| c.start_tick.cmp(&cue.start_tick))
            .unwrap_or_else(|i| i);
        self.cues.insert(idx, cue);
        Ok(())
    }

    /// Gets a cue by id
    pub fn cue(&self, cue_id: &str) -> Option<&Caption> {
        self.cues.iter().find(|c| c.id == cue_id)
    }

    /// Returns the cue visible at the given tick, if any
    pub fn cue_at(&self, tick: Tick) -> Option<&Caption> {
        self.cues.iter().find(|c| c.is_visible_at(tick))
    }

    /// End of the last cue in ticks (0 for an empty track)
    pub fn duration_ticks(&self) -> Tick {
        self.cues.iter().map(|c| c.end_tick).max().unwrap_or(0)
    }
}

// =============================================================================
// Tests
// =============================================================================
