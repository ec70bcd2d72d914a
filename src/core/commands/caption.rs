//! Caption Commands Module
//!
//! Installs a finished caption track onto the timeline. Transcription
//! results arrive here as a normal edit command, so caption installation is
//! undoable like any other mutation.

use serde::{Deserialize, Serialize};

use crate::core::{
    captions::CaptionTrack,
    commands::{Command, CommandResult, StateChange},
    timeline::{Element, Timeline, Track},
    CoreResult, TrackId,
};

// =============================================================================
// InstallCaptionTrackCommand
// =============================================================================

/// Command to install a caption track and its timeline track.
///
/// Adds the cue list to the timeline's caption storage and creates a track
/// of kind Caption carrying one element per cue. Undo removes both.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallCaptionTrackCommand {
    /// Display name for the timeline track
    pub track_name: String,
    /// The cue list to install
    pub caption_track: CaptionTrack,
    /// Position to insert the track at (optional, defaults to end)
    pub position: Option<usize>,
    /// Created track ID (stored after execution)
    #[serde(skip)]
    created_track_id: Option<TrackId>,
}

impl InstallCaptionTrackCommand {
    /// Creates a new install caption track command
    pub fn new(track_name: &str, caption_track: CaptionTrack) -> Self {
        Self {
            track_name: track_name.to_string(),
            caption_track,
            position: None,
            created_track_id: None,
        }
    }

    /// Sets the position to insert the track at
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    /// Id of the created timeline track (after execution)
    pub fn track_id(&self) -> Option<&TrackId> {
        self.created_track_id.as_ref()
    }
}

impl Command for InstallCaptionTrackCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let caption_track_id = timeline.add_caption_track(self.caption_track.clone());

        // One element per cue; cues are sorted and non-overlapping, so the
        // elements satisfy the track invariants by construction.
        let mut track = Track::new_caption(&self.track_name, &caption_track_id);
        for cue in &self.caption_track.cues {
            track
                .elements
                .push(Element::from_cue(&cue.id, cue.start_tick, cue.duration()));
        }

        let track_id = timeline.add_track(track, self.position);
        self.created_track_id = Some(track_id.clone());

        Ok(CommandResult::new()
            .with_change(StateChange::CaptionTrackInstalled {
                caption_track_id: caption_track_id.clone(),
            })
            .with_change(StateChange::TrackCreated {
                track_id: track_id.clone(),
            })
            .with_created_id(&caption_track_id)
            .with_created_id(&track_id))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        // remove_track also takes the referenced caption cues with it
        if let Some(track_id) = &self.created_track_id {
            timeline.remove_track(track_id)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "InstallCaptionTrack"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::captions::Caption;
    use crate::core::timeline::TrackKind;

    fn sample_captions() -> CaptionTrack {
        let mut track = CaptionTrack::new("Transcript", "en");
        track.add_cue(Caption::create(0, 600, "hello")).unwrap();
        track.add_cue(Caption::create(700, 1200, "world")).unwrap();
        track
    }

    #[test]
    fn test_install_creates_track_and_cues() {
        let mut timeline = Timeline::new();
        let captions = sample_captions();
        let captions_id = captions.id.clone();

        let mut cmd = InstallCaptionTrackCommand::new("Captions", captions);
        let result = cmd.execute(&mut timeline).unwrap();

        assert_eq!(result.created_ids.len(), 2);
        assert!(timeline.get_caption_track(&captions_id).is_some());

        let track = timeline.get_track(cmd.track_id().unwrap()).unwrap();
        assert_eq!(track.kind, TrackKind::Caption);
        assert_eq!(track.caption_track_id.as_deref(), Some(captions_id.as_str()));
        assert_eq!(track.elements.len(), 2);
        assert_eq!(track.elements[0].place.start_tick, 0);
        assert_eq!(track.elements[1].place.start_tick, 700);
    }

    #[test]
    fn test_install_undo_removes_both() {
        let mut timeline = Timeline::new();
        let captions = sample_captions();
        let captions_id = captions.id.clone();

        let mut cmd = InstallCaptionTrackCommand::new("Captions", captions);
        cmd.execute(&mut timeline).unwrap();

        cmd.undo(&mut timeline).unwrap();
        assert!(timeline.tracks.is_empty());
        assert!(timeline.get_caption_track(&captions_id).is_none());
    }

    #[test]
    fn test_install_redo() {
        let mut timeline = Timeline::new();
        let mut cmd = InstallCaptionTrackCommand::new("Captions", sample_captions());

        cmd.execute(&mut timeline).unwrap();
        cmd.undo(&mut timeline).unwrap();
        cmd.redo(&mut timeline).unwrap();

        assert_eq!(timeline.tracks.len(), 1);
        assert_eq!(timeline.caption_tracks.len(), 1);
    }
}
