//! Track Commands Module
//!
//! Implements all track-level editing commands.

use serde::{Deserialize, Serialize};

use crate::core::{
    captions::CaptionTrack,
    commands::{Command, CommandResult, StateChange},
    timeline::{Timeline, Track, TrackKind},
    CoreResult, TrackId,
};

// =============================================================================
// AddTrackCommand
// =============================================================================

/// Command to add a new track to the timeline
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackCommand {
    /// Track name
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Position to insert at (optional, defaults to end)
    pub position: Option<usize>,
    /// Created track ID (stored after execution)
    #[serde(skip)]
    created_track_id: Option<TrackId>,
}

impl AddTrackCommand {
    /// Creates a new add track command
    pub fn new(name: &str, kind: TrackKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            position: None,
            created_track_id: None,
        }
    }

    /// Sets the position to insert the track at
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }
}

impl Command for AddTrackCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let track = Track::new(&self.name, self.kind);
        let track_id = timeline.add_track(track, self.position);

        // Store created track ID for undo
        self.created_track_id = Some(track_id.clone());

        Ok(CommandResult::new()
            .with_change(StateChange::TrackCreated {
                track_id: track_id.clone(),
            })
            .with_created_id(&track_id))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some(track_id) = &self.created_track_id {
            timeline.remove_track(track_id)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "AddTrack"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// RemoveTrackCommand
// =============================================================================

/// Command to remove a track from the timeline
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTrackCommand {
    /// Track ID to remove
    pub track_id: TrackId,
    /// Removed track, position, and any referenced caption cues (for undo)
    #[serde(skip)]
    removed: Option<(usize, Track, Option<CaptionTrack>)>,
}

impl RemoveTrackCommand {
    /// Creates a new remove track command
    pub fn new(track_id: &str) -> Self {
        Self {
            track_id: track_id.to_string(),
            removed: None,
        }
    }
}

impl Command for RemoveTrackCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let removed = timeline.remove_track(&self.track_id)?;
        self.removed = Some(removed);

        Ok(CommandResult::new()
            .with_change(StateChange::TrackDeleted {
                track_id: self.track_id.clone(),
            })
            .with_deleted_id(&self.track_id))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some((position, track, caption_track)) = &self.removed {
            if let Some(caption_track) = caption_track {
                timeline.add_caption_track(caption_track.clone());
            }
            timeline.add_track(track.clone(), Some(*position));
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "RemoveTrack"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// ReorderTracksCommand
// =============================================================================

/// Command to reorder timeline tracks
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderTracksCommand {
    /// New order of track IDs
    pub new_order: Vec<TrackId>,
    /// Original order (for undo)
    #[serde(skip)]
    original_order: Option<Vec<TrackId>>,
}

impl ReorderTracksCommand {
    /// Creates a new reorder tracks command
    pub fn new(new_order: Vec<TrackId>) -> Self {
        Self {
            new_order,
            original_order: None,
        }
    }
}

impl Command for ReorderTracksCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let old_order = timeline.reorder_tracks(&self.new_order)?;
        self.original_order = Some(old_order);

        Ok(CommandResult::new().with_change(StateChange::TracksReordered))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some(original_order) = &self.original_order {
            timeline.reorder_tracks(original_order)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "ReorderTracks"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// SetTrackEnabledCommand
// =============================================================================

/// Command to enable or disable a track
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetTrackEnabledCommand {
    /// Track ID to change
    pub track_id: TrackId,
    /// New enabled flag
    pub enabled: bool,
    /// Previous flag (for undo)
    #[serde(skip)]
    old_enabled: Option<bool>,
}

impl SetTrackEnabledCommand {
    /// Creates a new set track enabled command
    pub fn new(track_id: &str, enabled: bool) -> Self {
        Self {
            track_id: track_id.to_string(),
            enabled,
            old_enabled: None,
        }
    }
}

impl Command for SetTrackEnabledCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let old = timeline.set_track_enabled(&self.track_id, self.enabled)?;
        self.old_enabled = Some(old);

        Ok(CommandResult::new().with_change(StateChange::TrackModified {
            track_id: self.track_id.clone(),
        }))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some(old) = self.old_enabled {
            timeline.set_track_enabled(&self.track_id, old)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SetTrackEnabled"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// Tests
// =============================================================================
