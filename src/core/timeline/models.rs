//! Timeline Model Definitions
//!
//! Defines Timeline, Track, Element and related types. Tracks own their
//! elements; elements reference media assets and caption cues by id only,
//! so the ownership graph stays acyclic.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{
    captions::CaptionTrack, AssetId, CaptionId, CaptionTrackId, ElementId, Tick, TickRange,
    TrackId,
};

// =============================================================================
// Source Reference
// =============================================================================

/// What an element renders: a media asset or a caption cue.
///
/// Always an id, never owned data: assets live in the registry, cues in the
/// timeline's caption tracks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SourceRef {
    Asset { asset_id: AssetId },
    Cue { cue_id: CaptionId },
}

impl SourceRef {
    pub fn asset(asset_id: &str) -> Self {
        Self::Asset {
            asset_id: asset_id.to_string(),
        }
    }

    pub fn cue(cue_id: &str) -> Self {
        Self::Cue {
            cue_id: cue_id.to_string(),
        }
    }
}

// =============================================================================
// Trim and Placement
// =============================================================================

/// Trimmed range within the source, in ticks
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimRange {
    /// Start within the source
    pub in_tick: Tick,
    /// End within the source (exclusive)
    pub out_tick: Tick,
}

impl TrimRange {
    pub fn new(in_tick: Tick, out_tick: Tick) -> Self {
        Self { in_tick, out_tick }
    }

    /// Returns the trimmed duration
    pub fn duration(&self) -> Tick {
        self.out_tick - self.in_tick
    }
}

/// Element placement on the timeline
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    /// Start tick on the timeline
    pub start_tick: Tick,
    /// Covered duration in ticks
    pub duration_ticks: Tick,
}

impl Placement {
    pub fn new(start_tick: Tick, duration_ticks: Tick) -> Self {
        Self {
            start_tick,
            duration_ticks,
        }
    }

    /// Returns the end tick (exclusive)
    pub fn end_tick(&self) -> Tick {
        self.start_tick + self.duration_ticks
    }

    /// Returns the covered half-open range
    pub fn range(&self) -> TickRange {
        TickRange::new(self.start_tick, self.end_tick())
    }

    /// Checks if this placement overlaps with another
    pub fn overlaps(&self, other: &Placement) -> bool {
        self.range().overlaps(&other.range())
    }

    /// Checks if a tick falls within this placement (half-open)
    pub fn contains(&self, tick: Tick) -> bool {
        self.range().contains(tick)
    }
}

// =============================================================================
// Element
// =============================================================================

/// A placed, trimmed reference to a media asset or caption cue on a track
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: ElementId,
    pub source: SourceRef,
    /// Range within the source
    pub trim: TrimRange,
    /// Placement on the timeline
    pub place: Placement,
}

impl Element {
    /// Creates an element covering `trim` of the given asset, placed at
    /// `start_tick`. Timeline duration equals the trimmed duration.
    pub fn from_asset(asset_id: &str, trim: TrimRange, start_tick: Tick) -> Self {
        let duration = trim.duration();
        Self {
            id: ulid::Ulid::new().to_string(),
            source: SourceRef::asset(asset_id),
            trim,
            place: Placement::new(start_tick, duration),
        }
    }

    /// Creates an element rendering a caption cue over `[start, start+duration)`
    pub fn from_cue(cue_id: &str, start_tick: Tick, duration_ticks: Tick) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            source: SourceRef::cue(cue_id),
            trim: TrimRange::new(0, duration_ticks),
            place: Placement::new(start_tick, duration_ticks),
        }
    }

    /// Returns the timeline end position (exclusive)
    pub fn end_tick(&self) -> Tick {
        self.place.end_tick()
    }

    /// Checks if this element covers the given timeline tick
    pub fn contains_tick(&self, tick: Tick) -> bool {
        self.place.contains(tick)
    }

    /// Converts a timeline tick to the corresponding source tick
    pub fn timeline_to_source(&self, tick: Tick) -> Tick {
        self.trim.in_tick + (tick - self.place.start_tick)
    }
}

// =============================================================================
// Track
// =============================================================================

/// Track kind enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Video,
    Audio,
    Caption,
}

/// Track (owns its elements, sorted by start tick)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    pub name: String,
    /// Elements kept sorted by timeline start
    pub elements: Vec<Element>,
    /// Disabled tracks are skipped during export
    pub enabled: bool,
    /// The caption track rendered by this track (kind Caption only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption_track_id: Option<CaptionTrackId>,
}

impl Track {
    /// Creates a new track with the given name and kind
    pub fn new(name: &str, kind: TrackKind) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind,
            name: name.to_string(),
            elements: vec![],
            enabled: true,
            caption_track_id: None,
        }
    }

    /// Creates a new video track
    pub fn new_video(name: &str) -> Self {
        Self::new(name, TrackKind::Video)
    }

    /// Creates a new audio track
    pub fn new_audio(name: &str) -> Self {
        Self::new(name, TrackKind::Audio)
    }

    /// Creates a caption track bound to the given cue list
    pub fn new_caption(name: &str, caption_track_id: &str) -> Self {
        let mut track = Self::new(name, TrackKind::Caption);
        track.caption_track_id = Some(caption_track_id.to_string());
        track
    }

    /// Gets an element by id
    pub fn get_element(&self, element_id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id == element_id)
    }

    /// First element overlapping `candidate`, ignoring `ignore_element_id`
    pub fn find_overlap(
        &self,
        candidate: &Placement,
        ignore_element_id: Option<&str>,
    ) -> Option<&Element> {
        self.elements.iter().find(|existing| {
            if ignore_element_id.is_some_and(|id| id == existing.id) {
                return false;
            }
            existing.place.overlaps(candidate)
        })
    }

    /// End tick of the last element (0 for an empty track)
    pub fn duration_ticks(&self) -> Tick {
        self.elements.iter().map(|e| e.end_tick()).max().unwrap_or(0)
    }

    pub(crate) fn sort_elements(&mut self) {
        self.elements.sort_by(|a, b| {
            a.place
                .start_tick
                .cmp(&b.place.start_tick)
                // Deterministic ordering when two elements share a start tick
                .then_with(|| a.id.cmp(&b.id))
        });
    }

    pub(crate) fn insert_element_sorted(&mut self, element: Element) {
        let idx = self
            .elements
            .binary_search_by(|existing| existing.place.start_tick.cmp(&element.place.start_tick))
            .unwrap_or_else(|i| i);
        self.elements.insert(idx, element);
        self.sort_elements();
    }
}

// =============================================================================
// Timeline
// =============================================================================

/// The timeline: ordered tracks, caption cue storage, playhead and selection.
///
/// Track order is z-order for video and mix order for audio. Mutations go
/// through the operations in `ops.rs`, which the edit commands wrap; every
/// mutation bumps `version`. `Clone` yields the immutable snapshot the
/// export pipeline renders from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub tracks: Vec<Track>,
    /// Caption cue lists, referenced by tracks of kind Caption
    pub caption_tracks: HashMap<CaptionTrackId, CaptionTrack>,
    pub playhead_tick: Tick,
    pub selection: BTreeSet<ElementId>,
    /// Increments on every atomic mutation
    pub version: u64,
}

impl Timeline {
    /// Creates a new empty timeline
    pub fn new() -> Self {
        Self {
            tracks: vec![],
            caption_tracks: HashMap::new(),
            playhead_tick: 0,
            selection: BTreeSet::new(),
            version: 0,
        }
    }

    /// Gets a track by id
    pub fn get_track(&self, track_id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == track_id)
    }

    pub(crate) fn get_track_mut(&mut self, track_id: &str) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == track_id)
    }

    /// Finds an element and the track holding it
    pub fn find_element(&self, element_id: &str) -> Option<(&Track, &Element)> {
        self.tracks.iter().find_map(|track| {
            track
                .get_element(element_id)
                .map(|element| (track, element))
        })
    }

    /// Gets a caption cue list by id
    pub fn get_caption_track(&self, caption_track_id: &str) -> Option<&CaptionTrack> {
        self.caption_tracks.get(caption_track_id)
    }

    /// Total duration in ticks across all tracks
    pub fn duration_ticks(&self) -> Tick {
        self.tracks
            .iter()
            .map(|t| t.duration_ticks())
            .max()
            .unwrap_or(0)
    }

    /// Duration in ticks across enabled tracks only (what an export renders)
    pub fn render_duration_ticks(&self) -> Tick {
        self.tracks
            .iter()
            .filter(|t| t.enabled)
            .map(|t| t.duration_ticks())
            .max()
            .unwrap_or(0)
    }

    /// Active elements at the given tick across enabled tracks, in track
    /// order (z-order for video, mix order for audio).
    pub fn elements_at(&self, tick: Tick) -> Vec<(&Track, &Element)> {
        self.tracks
            .iter()
            .filter(|t| t.enabled)
            .flat_map(|track| {
                track
                    .elements
                    .iter()
                    .filter(move |e| e.contains_tick(tick))
                    .map(move |e| (track, e))
            })
            .collect()
    }

    pub(crate) fn mark_changed(&mut self) {
        self.version += 1;
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
