//! Element Commands Module
//!
//! Implements all element-level editing commands. Each command delegates to
//! the validated timeline operation and keeps the returned old state so its
//! inverse never has to re-derive anything.

use serde::{Deserialize, Serialize};

use crate::core::{
    commands::{Command, CommandResult, StateChange},
    timeline::{Element, SplitUndo, Timeline, TrimRange, TrimUndo},
    CoreResult, ElementId, Tick, TrackId,
};

// =============================================================================
// AddElementCommand
// =============================================================================

/// Command to add an element to a track
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddElementCommand {
    /// Target track ID
    pub track_id: TrackId,
    /// The element to insert (carries its own id)
    pub element: Element,
    /// Duration of the referenced media asset, when known; the trim window
    /// is validated against it
    pub source_duration_ticks: Option<Tick>,
}

impl AddElementCommand {
    /// Creates a new add element command
    pub fn new(track_id: &str, element: Element) -> Self {
        Self {
            track_id: track_id.to_string(),
            element,
            source_duration_ticks: None,
        }
    }

    /// Sets the source asset duration for trim validation
    pub fn with_source_duration(mut self, duration_ticks: Tick) -> Self {
        self.source_duration_ticks = Some(duration_ticks);
        self
    }
}

impl Command for AddElementCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let element_id = timeline.insert_element(
            &self.track_id,
            self.element.clone(),
            self.source_duration_ticks,
        )?;

        Ok(CommandResult::new()
            .with_change(StateChange::ElementCreated {
                element_id: element_id.clone(),
            })
            .with_created_id(&element_id))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        timeline.remove_element(&self.element.id)?;
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "AddElement"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// RemoveElementCommand
// =============================================================================

/// Command to remove an element from its track
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveElementCommand {
    /// Element ID to remove
    pub element_id: ElementId,
    /// Removed element, its track and index (for undo)
    #[serde(skip)]
    removed: Option<(TrackId, usize, Element)>,
}

impl RemoveElementCommand {
    /// Creates a new remove element command
    pub fn new(element_id: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
            removed: None,
        }
    }
}

impl Command for RemoveElementCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let removed = timeline.remove_element(&self.element_id)?;
        self.removed = Some(removed);

        Ok(CommandResult::new()
            .with_change(StateChange::ElementDeleted {
                element_id: self.element_id.clone(),
            })
            .with_deleted_id(&self.element_id))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some((track_id, index, element)) = &self.removed {
            timeline.restore_element(track_id, *index, element.clone())?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "RemoveElement"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// MoveElementCommand
// =============================================================================

/// Command to move an element to a new timeline position
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveElementCommand {
    /// Element ID to move
    pub element_id: ElementId,
    /// New timeline start tick
    pub new_start_tick: Tick,
    /// Previous start tick (for undo)
    #[serde(skip)]
    old_start_tick: Option<Tick>,
}

impl MoveElementCommand {
    /// Creates a new move element command
    pub fn new(element_id: &str, new_start_tick: Tick) -> Self {
        Self {
            element_id: element_id.to_string(),
            new_start_tick,
            old_start_tick: None,
        }
    }
}

impl Command for MoveElementCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let (_, old_start) = timeline.move_element(&self.element_id, self.new_start_tick)?;
        self.old_start_tick = Some(old_start);

        Ok(CommandResult::new().with_change(StateChange::ElementModified {
            element_id: self.element_id.clone(),
        }))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some(old_start) = self.old_start_tick {
            timeline.move_element(&self.element_id, old_start)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "MoveElement"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// TrimElementCommand
// =============================================================================

/// Command to retrim an element's source window
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimElementCommand {
    /// Element ID to trim
    pub element_id: ElementId,
    /// New trim window within the source
    pub new_trim: TrimRange,
    /// Duration of the referenced media asset, when known
    pub source_duration_ticks: Option<Tick>,
    /// Displaced trim and placement (for undo)
    #[serde(skip)]
    undo_state: Option<TrimUndo>,
}

impl TrimElementCommand {
    /// Creates a new trim element command
    pub fn new(element_id: &str, new_trim: TrimRange) -> Self {
        Self {
            element_id: element_id.to_string(),
            new_trim,
            source_duration_ticks: None,
            undo_state: None,
        }
    }

    /// Sets the source asset duration for trim validation
    pub fn with_source_duration(mut self, duration_ticks: Tick) -> Self {
        self.source_duration_ticks = Some(duration_ticks);
        self
    }
}

impl Command for TrimElementCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let undo = timeline.trim_element(
            &self.element_id,
            self.new_trim.clone(),
            self.source_duration_ticks,
        )?;
        self.undo_state = Some(undo);

        Ok(CommandResult::new().with_change(StateChange::ElementModified {
            element_id: self.element_id.clone(),
        }))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some(undo) = &self.undo_state {
            timeline.restore_trim(
                &self.element_id,
                undo.old_trim.clone(),
                undo.old_place.clone(),
            )?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "TrimElement"
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::json!({}))
    }
}

// =============================================================================
// SplitElementCommand
// =============================================================================

/// Command to split an element in two at a timeline tick
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitElementCommand {
    /// Element ID to split
    pub element_id: ElementId,
    /// Split point on the timeline
    pub at_tick: Tick,
    /// Original element and right-half id (for undo)
    #[serde(skip)]
    undo_state: Option<SplitUndo>,
}

impl SplitElementCommand {
    /// Creates a new split element command
    pub fn new(element_id: &str, at_tick: Tick) -> Self {
        Self {
            element_id: element_id.to_string(),
            at_tick,
            undo_state: None,
        }
    }

    /// Id of the right half created by the split (after execution)
    pub fn right_element_id(&self) -> Option<&ElementId> {
        self.undo_state.as_ref().map(|u| &u.right_id)
    }
}

impl Command for SplitElementCommand {
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        let undo = timeline.split_element(&self.element_id, self.at_tick)?;
        let right_id = undo.right_id.clone();
        self.undo_state = Some(undo);

        Ok(CommandResult::new()
            .with_change(StateChange::ElementModified {
                element_id: self.element_id.clone(),
            })
            .with_change(StateChange::ElementCreated {
                element_id: right_id.clone(),
            })
            .with_created_id(&right_id))
    }

    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()> {
        if let Some(undo) = &self.undo_state {
            timeline.unsplit_element(undo)?;
        }
        Ok(())
    }

    fn type_name(&self) -> &'static str {
        "SplitElement"
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
    use crate::core::timeline::Track;
    use crate::core::CoreError;

    fn timeline_with_track() -> (Timeline, TrackId) {
        let mut timeline = Timeline::new();
        let track_id = timeline.add_track(Track::new_video("Video 1"), None);
        (timeline, track_id)
    }

    #[test]
    fn test_add_element_roundtrip() {
        let (mut timeline, track_id) = timeline_with_track();

        let element = Element::from_asset("asset_1", TrimRange::new(0, 600), 0);
        let element_id = element.id.clone();
        let mut cmd = AddElementCommand::new(&track_id, element).with_source_duration(1000);

        let result = cmd.execute(&mut timeline).unwrap();
        assert_eq!(result.created_ids, vec![element_id.clone()]);
        assert!(timeline.find_element(&element_id).is_some());

        cmd.undo(&mut timeline).unwrap();
        assert!(timeline.find_element(&element_id).is_none());

        // Redo re-inserts the identical element
        cmd.redo(&mut timeline).unwrap();
        assert!(timeline.find_element(&element_id).is_some());
    }

    #[test]
    fn test_add_element_overlap_fails_cleanly() {
        let (mut timeline, track_id) = timeline_with_track();

        let mut first = AddElementCommand::new(
            &track_id,
            Element::from_asset("a", TrimRange::new(0, 100), 0),
        );
        first.execute(&mut timeline).unwrap();

        let mut second = AddElementCommand::new(
            &track_id,
            Element::from_asset("b", TrimRange::new(0, 100), 50),
        );
        let result = second.execute(&mut timeline);
        assert!(matches!(result, Err(CoreError::ElementOverlap { .. })));
        assert_eq!(timeline.get_track(&track_id).unwrap().elements.len(), 1);
    }

    #[test]
    fn test_remove_element_restores_at_index() {
        let (mut timeline, track_id) = timeline_with_track();

        let mut add_a = AddElementCommand::new(
            &track_id,
            Element::from_asset("a", TrimRange::new(0, 100), 0),
        );
        let a_id = add_a.execute(&mut timeline).unwrap().created_ids[0].clone();
        let mut add_b = AddElementCommand::new(
            &track_id,
            Element::from_asset("b", TrimRange::new(0, 100), 200),
        );
        add_b.execute(&mut timeline).unwrap();

        let before = timeline.get_track(&track_id).unwrap().elements.clone();

        let mut remove = RemoveElementCommand::new(&a_id);
        remove.execute(&mut timeline).unwrap();
        assert_eq!(timeline.get_track(&track_id).unwrap().elements.len(), 1);

        remove.undo(&mut timeline).unwrap();
        assert_eq!(timeline.get_track(&track_id).unwrap().elements, before);
    }

    #[test]
    fn test_move_element_roundtrip() {
        let (mut timeline, track_id) = timeline_with_track();
        let mut add = AddElementCommand::new(
            &track_id,
            Element::from_asset("a", TrimRange::new(0, 100), 0),
        );
        let id = add.execute(&mut timeline).unwrap().created_ids[0].clone();

        let mut mv = MoveElementCommand::new(&id, 500);
        mv.execute(&mut timeline).unwrap();
        assert_eq!(
            timeline.find_element(&id).unwrap().1.place.start_tick,
            500
        );

        mv.undo(&mut timeline).unwrap();
        assert_eq!(timeline.find_element(&id).unwrap().1.place.start_tick, 0);
    }

    #[test]
    fn test_trim_element_roundtrip() {
        let (mut timeline, track_id) = timeline_with_track();
        let mut add = AddElementCommand::new(
            &track_id,
            Element::from_asset("a", TrimRange::new(0, 600), 0),
        )
        .with_source_duration(1000);
        let id = add.execute(&mut timeline).unwrap().created_ids[0].clone();

        let mut trim =
            TrimElementCommand::new(&id, TrimRange::new(100, 400)).with_source_duration(1000);
        trim.execute(&mut timeline).unwrap();

        let (_, element) = timeline.find_element(&id).unwrap();
        assert_eq!(element.place.duration_ticks, 300);

        trim.undo(&mut timeline).unwrap();
        let (_, element) = timeline.find_element(&id).unwrap();
        assert_eq!(element.trim, TrimRange::new(0, 600));
        assert_eq!(element.place.duration_ticks, 600);
    }

    #[test]
    fn test_split_element_roundtrip() {
        let (mut timeline, track_id) = timeline_with_track();
        let mut add = AddElementCommand::new(
            &track_id,
            Element::from_asset("a", TrimRange::new(0, 600), 0),
        );
        let id = add.execute(&mut timeline).unwrap().created_ids[0].clone();
        let before = timeline.get_track(&track_id).unwrap().elements.clone();

        let mut split = SplitElementCommand::new(&id, 250);
        let result = split.execute(&mut timeline).unwrap();
        assert_eq!(result.created_ids.len(), 1);
        assert_eq!(timeline.get_track(&track_id).unwrap().elements.len(), 2);

        split.undo(&mut timeline).unwrap();
        assert_eq!(timeline.get_track(&track_id).unwrap().elements, before);
    }
}
