//! Timeline Operations
//!
//! The validated, atomic mutations on [`Timeline`]. Every operation either
//! fully applies or fully rejects (validation happens before any state is
//! touched) and returns the displaced old state so the wrapping edit
//! command can construct its inverse without re-deriving it.
//!
//! Selection and playhead are plain state: they bump the version for
//! observers but are not part of undo history.

use std::collections::BTreeSet;

use tracing::warn;

use crate::core::{
    captions::CaptionTrack,
    timeline::{Element, Placement, SourceRef, Timeline, Track, TrimRange},
    CaptionTrackId, CoreError, CoreResult, ElementId, Tick, TrackId,
};

/// Old state displaced by a trim, returned for inverse construction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrimUndo {
    pub track_id: TrackId,
    pub old_trim: TrimRange,
    pub old_place: Placement,
}

/// Old state displaced by a split, returned for inverse construction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitUndo {
    pub track_id: TrackId,
    /// The element as it was before the split (same id as the left half)
    pub original: Element,
    /// Id of the newly created right half
    pub right_id: ElementId,
}

fn validate_element_shape(element: &Element) -> CoreResult<()> {
    if element.place.start_tick < 0 {
        return Err(CoreError::ValidationError(
            "element start tick must be non-negative".to_string(),
        ));
    }
    if element.place.duration_ticks <= 0 {
        return Err(CoreError::InvalidRange(
            element.place.start_tick,
            element.end_tick(),
        ));
    }
    if element.trim.in_tick < 0 || element.trim.out_tick <= element.trim.in_tick {
        return Err(CoreError::InvalidRange(
            element.trim.in_tick,
            element.trim.out_tick,
        ));
    }
    if element.trim.duration() != element.place.duration_ticks {
        return Err(CoreError::ValidationError(
            "element trim duration must match its timeline duration".to_string(),
        ));
    }
    Ok(())
}

fn validate_source_bound(
    trim: &TrimRange,
    source: &SourceRef,
    source_duration: Option<Tick>,
) -> CoreResult<()> {
    // The trim window must stay inside the source asset. Cue-backed
    // elements have no independent source duration to check against.
    if let (SourceRef::Asset { .. }, Some(duration)) = (source, source_duration) {
        if trim.out_tick > duration {
            return Err(CoreError::InvalidRange(trim.in_tick, trim.out_tick));
        }
    }
    Ok(())
}

impl Timeline {
    /// Inserts an element into a track.
    ///
    /// `source_duration` is the duration of the referenced media asset when
    /// known; the trim window is validated against it. Fails with
    /// `ElementOverlap` when the placement collides with an existing
    /// element (overlaps are rejected, never auto-shifted).
    pub fn insert_element(
        &mut self,
        track_id: &str,
        element: Element,
        source_duration: Option<Tick>,
    ) -> CoreResult<ElementId> {
        validate_element_shape(&element)?;
        validate_source_bound(&element.trim, &element.source, source_duration)?;

        let track = self
            .get_track_mut(track_id)
            .ok_or_else(|| CoreError::TrackNotFound(track_id.to_string()))?;

        if let Some(conflict) = track.find_overlap(&element.place, None) {
            return Err(CoreError::ElementOverlap {
                track_id: track.id.clone(),
                existing_element_id: conflict.id.clone(),
                new_start: element.place.start_tick,
                new_end: element.end_tick(),
            });
        }

        let element_id = element.id.clone();
        track.insert_element_sorted(element);
        self.mark_changed();
        Ok(element_id)
    }

    /// Removes an element, returning its track, index and data for undo.
    /// The element also disappears from the selection.
    pub fn remove_element(&mut self, element_id: &str) -> CoreResult<(TrackId, usize, Element)> {
        let (track_idx, element_idx) = self.locate_element(element_id)?;

        let track = &mut self.tracks[track_idx];
        let track_id = track.id.clone();
        let element = track.elements.remove(element_idx);

        self.selection.remove(element_id);
        self.mark_changed();
        Ok((track_id, element_idx, element))
    }

    /// Re-inserts a previously removed element at its original index.
    ///
    /// Used by undo paths; the element is trusted to have been valid when
    /// it was removed.
    pub fn restore_element(
        &mut self,
        track_id: &str,
        index: usize,
        element: Element,
    ) -> CoreResult<()> {
        let track = self
            .get_track_mut(track_id)
            .ok_or_else(|| CoreError::TrackNotFound(track_id.to_string()))?;

        if index <= track.elements.len() {
            track.elements.insert(index, element);
        } else {
            track.elements.push(element);
        }
        track.sort_elements();
        self.mark_changed();
        Ok(())
    }

    /// Moves an element to a new start tick, returning the old start.
    pub fn move_element(&mut self, element_id: &str, new_start_tick: Tick) -> CoreResult<(TrackId, Tick)> {
        if new_start_tick < 0 {
            return Err(CoreError::ValidationError(
                "element start tick must be non-negative".to_string(),
            ));
        }

        let (track_idx, element_idx) = self.locate_element(element_id)?;
        let track = &mut self.tracks[track_idx];

        let candidate = Placement::new(
            new_start_tick,
            track.elements[element_idx].place.duration_ticks,
        );
        if let Some(conflict) = track.find_overlap(&candidate, Some(element_id)) {
            return Err(CoreError::ElementOverlap {
                track_id: track.id.clone(),
                existing_element_id: conflict.id.clone(),
                new_start: candidate.start_tick,
                new_end: candidate.end_tick(),
            });
        }

        let track_id = track.id.clone();
        let old_start = track.elements[element_idx].place.start_tick;
        track.elements[element_idx].place.start_tick = new_start_tick;
        track.sort_elements();
        self.mark_changed();
        Ok((track_id, old_start))
    }

    /// Retrims an element. The placement start is unchanged; the timeline
    /// duration follows the new trim window. Returns the displaced trim and
    /// placement.
    pub fn trim_element(
        &mut self,
        element_id: &str,
        new_trim: TrimRange,
        source_duration: Option<Tick>,
    ) -> CoreResult<TrimUndo> {
        if new_trim.in_tick < 0 || new_trim.out_tick <= new_trim.in_tick {
            return Err(CoreError::InvalidRange(new_trim.in_tick, new_trim.out_tick));
        }

        let (track_idx, element_idx) = self.locate_element(element_id)?;
        let track = &mut self.tracks[track_idx];
        let element = &track.elements[element_idx];

        validate_source_bound(&new_trim, &element.source, source_duration)?;

        let candidate = Placement::new(element.place.start_tick, new_trim.duration());
        if let Some(conflict) = track.find_overlap(&candidate, Some(element_id)) {
            return Err(CoreError::ElementOverlap {
                track_id: track.id.clone(),
                existing_element_id: conflict.id.clone(),
                new_start: candidate.start_tick,
                new_end: candidate.end_tick(),
            });
        }

        let undo = TrimUndo {
            track_id: track.id.clone(),
            old_trim: element.trim.clone(),
            old_place: element.place.clone(),
        };

        let element = &mut track.elements[element_idx];
        element.trim = new_trim;
        element.place = candidate;
        self.mark_changed();
        Ok(undo)
    }

    /// Restores a trim undone state captured by [`Timeline::trim_element`].
    pub fn restore_trim(
        &mut self,
        element_id: &str,
        trim: TrimRange,
        place: Placement,
    ) -> CoreResult<()> {
        let (track_idx, element_idx) = self.locate_element(element_id)?;
        let element = &mut self.tracks[track_idx].elements[element_idx];
        element.trim = trim;
        element.place = place;
        self.mark_changed();
        Ok(())
    }

    /// Splits an element in two at `at_tick`.
    ///
    /// The left half keeps the original id, the right half is new; together
    /// they cover exactly the original range. `at_tick` must fall strictly
    /// inside the element.
    pub fn split_element(&mut self, element_id: &str, at_tick: Tick) -> CoreResult<SplitUndo> {
        let (track_idx, element_idx) = self.locate_element(element_id)?;
        let track = &mut self.tracks[track_idx];
        let element = &track.elements[element_idx];

        if at_tick <= element.place.start_tick || at_tick >= element.end_tick() {
            return Err(CoreError::InvalidSplitPoint(at_tick));
        }

        let original = element.clone();
        let left_duration = at_tick - element.place.start_tick;

        let right = Element {
            id: ulid::Ulid::new().to_string(),
            source: element.source.clone(),
            trim: TrimRange::new(element.trim.in_tick + left_duration, element.trim.out_tick),
            place: Placement::new(at_tick, element.place.duration_ticks - left_duration),
        };
        let right_id = right.id.clone();

        let left = &mut track.elements[element_idx];
        left.place.duration_ticks = left_duration;
        left.trim.out_tick = left.trim.in_tick + left_duration;

        let track_id = track.id.clone();
        track.insert_element_sorted(right);
        self.mark_changed();

        Ok(SplitUndo {
            track_id,
            original,
            right_id,
        })
    }

    /// Reverses a split: removes the right half and restores the original.
    pub fn unsplit_element(&mut self, undo: &SplitUndo) -> CoreResult<()> {
        let track = self
            .get_track_mut(&undo.track_id)
            .ok_or_else(|| CoreError::TrackNotFound(undo.track_id.clone()))?;

        track.elements.retain(|e| e.id != undo.right_id);
        if let Some(left) = track.elements.iter_mut().find(|e| e.id == undo.original.id) {
            *left = undo.original.clone();
        }
        track.sort_elements();
        self.mark_changed();
        Ok(())
    }

    /// Reorders tracks. `new_order` must contain exactly the current track
    /// ids; returns the previous order.
    pub fn reorder_tracks(&mut self, new_order: &[TrackId]) -> CoreResult<Vec<TrackId>> {
        let current: BTreeSet<&TrackId> = self.tracks.iter().map(|t| &t.id).collect();
        let requested: BTreeSet<&TrackId> = new_order.iter().collect();

        if new_order.len() != self.tracks.len() || current != requested {
            return Err(CoreError::InvalidTrackOrder(format!(
                "expected exactly the {} current track ids",
                self.tracks.len()
            )));
        }

        let old_order: Vec<TrackId> = self.tracks.iter().map(|t| t.id.clone()).collect();

        self.tracks.sort_by_key(|t| {
            new_order
                .iter()
                .position(|id| id == &t.id)
                .unwrap_or(usize::MAX)
        });
        self.mark_changed();
        Ok(old_order)
    }

    /// Adds a track, returning its id. `position` defaults to the end.
    pub fn add_track(&mut self, track: Track, position: Option<usize>) -> TrackId {
        let track_id = track.id.clone();
        match position {
            Some(pos) if pos <= self.tracks.len() => self.tracks.insert(pos, track),
            _ => self.tracks.push(track),
        }
        self.mark_changed();
        track_id
    }

    /// Removes a track, returning its position, data, and the caption cue
    /// list it referenced (so undo can restore both).
    pub fn remove_track(
        &mut self,
        track_id: &str,
    ) -> CoreResult<(usize, Track, Option<CaptionTrack>)> {
        let position = self
            .tracks
            .iter()
            .position(|t| t.id == track_id)
            .ok_or_else(|| CoreError::TrackNotFound(track_id.to_string()))?;

        let track = self.tracks.remove(position);
        for element in &track.elements {
            self.selection.remove(&element.id);
        }

        let caption_track = track
            .caption_track_id
            .as_ref()
            .and_then(|id| self.caption_tracks.remove(id));

        self.mark_changed();
        Ok((position, track, caption_track))
    }

    /// Installs a caption cue list. Tracks of kind Caption reference it by id.
    pub fn add_caption_track(&mut self, caption_track: CaptionTrack) -> CaptionTrackId {
        let id = caption_track.id.clone();
        self.caption_tracks.insert(id.clone(), caption_track);
        self.mark_changed();
        id
    }

    /// Removes a caption cue list by id.
    pub fn remove_caption_track(&mut self, caption_track_id: &str) -> Option<CaptionTrack> {
        let removed = self.caption_tracks.remove(caption_track_id);
        if removed.is_some() {
            self.mark_changed();
        }
        removed
    }

    /// Enables or disables a track, returning the previous flag.
    pub fn set_track_enabled(&mut self, track_id: &str, enabled: bool) -> CoreResult<bool> {
        let track = self
            .get_track_mut(track_id)
            .ok_or_else(|| CoreError::TrackNotFound(track_id.to_string()))?;
        let old = track.enabled;
        track.enabled = enabled;
        self.mark_changed();
        Ok(old)
    }

    /// Replaces the selection. All ids must refer to existing elements.
    /// Selection is observer state, not part of undo history.
    pub fn set_selection(&mut self, element_ids: &[ElementId]) -> CoreResult<()> {
        for id in element_ids {
            if self.find_element(id).is_none() {
                return Err(CoreError::ElementNotFound(id.clone()));
            }
        }
        self.selection = element_ids.iter().cloned().collect();
        self.mark_changed();
        Ok(())
    }

    /// Moves the playhead. Negative ticks are clamped to zero.
    pub fn set_playhead(&mut self, tick: Tick) {
        if tick < 0 {
            warn!("playhead set to negative tick {}, clamping to 0", tick);
        }
        self.playhead_tick = tick.max(0);
        self.mark_changed();
    }

    fn locate_element(&self, element_id: &str) -> CoreResult<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(t_idx, track)| {
                track
                    .elements
                    .iter()
                    .position(|e| e.id == element_id)
                    .map(|e_idx| (t_idx, e_idx))
            })
            .ok_or_else(|| CoreError::ElementNotFound(element_id.to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================
