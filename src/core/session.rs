//! Editor Session
//!
//! Wires the asset registry, timeline, command history and transcription
//! service into the single-writer editing surface. All timeline mutations
//! funnel through here on one logical editing task; background tasks
//! (asset loading, transcription, export) communicate back over event
//! channels and never touch the timeline directly.

use std::sync::Arc;

use crate::core::{
    assets::{AssetEvent, AssetRegistry, MediaDecoder},
    captions::{CaptionTrack, TranscriptionEvent, TranscriptionProvider, TranscriptionService},
    commands::{
        AddElementCommand, AddTrackCommand, CommandExecutor, InstallCaptionTrackCommand,
        MoveElementCommand, RemoveElementCommand, RemoveTrackCommand, ReorderTracksCommand,
        SetTrackEnabledCommand, SplitElementCommand, TimelineEvent, TrimElementCommand,
    },
    render::{ExportHandle, ExportPipeline, ExportSettings, FrameRenderer},
    timeline::{Element, SourceRef, Timeline, TrackKind, TrimRange},
    CoreResult, ElementId, JobId, Tick, TrackId,
};
use tokio::sync::mpsc;

/// The active editing session: registry, timeline, history, transcription.
pub struct EditorSession {
    registry: AssetRegistry,
    timeline: Timeline,
    history: CommandExecutor,
    transcription: TranscriptionService,
}

impl EditorSession {
    /// Creates a session around the external collaborators
    pub fn new(
        decoder: Arc<dyn MediaDecoder>,
        transcriber: Arc<dyn TranscriptionProvider>,
    ) -> Self {
        Self {
            registry: AssetRegistry::new(decoder),
            timeline: Timeline::new(),
            history: CommandExecutor::new(),
            transcription: TranscriptionService::new(transcriber),
        }
    }

    /// The asset registry
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// Read access to the timeline
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// The transcription service
    pub fn transcription(&self) -> &TranscriptionService {
        &self.transcription
    }

    /// Takes the asset event receiver (can only be called once)
    pub fn take_asset_events(&mut self) -> Option<mpsc::UnboundedReceiver<AssetEvent>> {
        self.registry.take_event_receiver()
    }

    /// Takes the timeline change receiver (can only be called once)
    pub fn take_timeline_events(&mut self) -> Option<mpsc::UnboundedReceiver<TimelineEvent>> {
        self.history.take_event_receiver()
    }

    /// Takes the transcription event receiver (can only be called once)
    pub fn take_transcription_events(
        &mut self,
    ) -> Option<mpsc::UnboundedReceiver<TranscriptionEvent>> {
        self.transcription.take_event_receiver()
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Adds a track, returning its id
    pub fn add_track(&mut self, name: &str, kind: TrackKind) -> CoreResult<TrackId> {
        let result = self.history.execute(
            Box::new(AddTrackCommand::new(name, kind)),
            &mut self.timeline,
        )?;
        Ok(result.created_ids[0].clone())
    }

    /// Removes a track (undoable)
    pub fn remove_track(&mut self, track_id: &str) -> CoreResult<()> {
        self.history.execute(
            Box::new(RemoveTrackCommand::new(track_id)),
            &mut self.timeline,
        )?;
        Ok(())
    }

    /// Reorders tracks; `new_order` must name exactly the current tracks
    pub fn reorder_tracks(&mut self, new_order: Vec<TrackId>) -> CoreResult<()> {
        self.history.execute(
            Box::new(ReorderTracksCommand::new(new_order)),
            &mut self.timeline,
        )?;
        Ok(())
    }

    /// Enables or disables a track (undoable)
    pub fn set_track_enabled(&mut self, track_id: &str, enabled: bool) -> CoreResult<()> {
        self.history.execute(
            Box::new(SetTrackEnabledCommand::new(track_id, enabled)),
            &mut self.timeline,
        )?;
        Ok(())
    }

    /// Places a trimmed window of a ready asset on a track.
    ///
    /// The asset must have finished loading; its duration bounds the trim.
    pub fn add_element(
        &mut self,
        track_id: &str,
        asset_id: &str,
        trim: TrimRange,
        start_tick: Tick,
    ) -> CoreResult<ElementId> {
        let asset = self.registry.get(asset_id)?;
        let element = Element::from_asset(asset_id, trim, start_tick);
        let result = self.history.execute(
            Box::new(
                AddElementCommand::new(track_id, element)
                    .with_source_duration(asset.duration_ticks),
            ),
            &mut self.timeline,
        )?;
        Ok(result.created_ids[0].clone())
    }

    /// Removes an element (undoable)
    pub fn remove_element(&mut self, element_id: &str) -> CoreResult<()> {
        self.history.execute(
            Box::new(RemoveElementCommand::new(element_id)),
            &mut self.timeline,
        )?;
        Ok(())
    }

    /// Moves an element to a new start tick
    pub fn move_element(&mut self, element_id: &str, new_start_tick: Tick) -> CoreResult<()> {
        self.history.execute(
            Box::new(MoveElementCommand::new(element_id, new_start_tick)),
            &mut self.timeline,
        )?;
        Ok(())
    }

    /// Retrims an element within its source
    pub fn trim_element(&mut self, element_id: &str, new_trim: TrimRange) -> CoreResult<()> {
        let mut command = TrimElementCommand::new(element_id, new_trim);
        if let Some(duration) = self.source_duration_of(element_id) {
            command = command.with_source_duration(duration);
        }
        self.history
            .execute(Box::new(command), &mut self.timeline)?;
        Ok(())
    }

    /// Splits an element at a timeline tick, returning the new right half
    pub fn split_element(&mut self, element_id: &str, at_tick: Tick) -> CoreResult<ElementId> {
        let result = self.history.execute(
            Box::new(SplitElementCommand::new(element_id, at_tick)),
            &mut self.timeline,
        )?;
        Ok(result.created_ids[0].clone())
    }

    /// Replaces the selection (not undoable)
    pub fn set_selection(&mut self, element_ids: &[ElementId]) -> CoreResult<()> {
        self.timeline.set_selection(element_ids)
    }

    /// Moves the playhead (not undoable)
    pub fn set_playhead(&mut self, tick: Tick) {
        self.timeline.set_playhead(tick);
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Undoes the last edit; `Ok(false)` when history is empty
    pub fn undo(&mut self) -> CoreResult<bool> {
        self.history.undo(&mut self.timeline)
    }

    /// Redoes the last undone edit; `Ok(false)` when there is nothing to redo
    pub fn redo(&mut self) -> CoreResult<bool> {
        self.history.redo(&mut self.timeline)
    }

    /// Batches subsequent edits into one undoable entry
    pub fn begin_transaction(&mut self) -> CoreResult<()> {
        self.history.begin_transaction()
    }

    /// Commits the open transaction
    pub fn commit_transaction(&mut self) -> CoreResult<()> {
        self.history.commit_transaction()
    }

    /// Aborts the open transaction, discarding its partial effects
    pub fn abort_transaction(&mut self) -> CoreResult<()> {
        self.history.abort_transaction(&mut self.timeline)
    }

    // =========================================================================
    // Captions
    // =========================================================================

    /// Requests transcription of a ready asset.
    ///
    /// Fails with `JobAlreadyActive` while a job for the asset is running.
    pub fn request_transcription(&mut self, asset_id: &str) -> CoreResult<JobId> {
        // Transcribing an asset that never loaded is a caller error
        let _ = self.registry.get(asset_id)?;
        self.transcription.request(asset_id)
    }

    /// Installs a finished caption track as an undoable edit.
    ///
    /// Called by the editing loop when a `TrackReady` event arrives.
    pub fn install_caption_track(
        &mut self,
        track_name: &str,
        track: CaptionTrack,
    ) -> CoreResult<TrackId> {
        let result = self.history.execute(
            Box::new(InstallCaptionTrackCommand::new(track_name, track)),
            &mut self.timeline,
        )?;
        // created_ids: [caption track, timeline track]
        Ok(result.created_ids[1].clone())
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Immutable copy of the current timeline state
    pub fn snapshot(&self) -> Timeline {
        self.timeline.clone()
    }

    /// Starts an export of the current timeline as a background task.
    /// Later edits never affect the running job.
    pub fn export(
        &self,
        renderer: Arc<dyn FrameRenderer>,
        settings: ExportSettings,
    ) -> ExportHandle {
        ExportPipeline::new(renderer, settings).start(self.snapshot())
    }

    fn source_duration_of(&self, element_id: &str) -> Option<Tick> {
        let (_, element) = self.timeline.find_element(element_id)?;
        match &element.source {
            SourceRef::Asset { asset_id } => {
                self.registry.get(asset_id).ok().map(|a| a.duration_ticks)
            }
            SourceRef::Cue { .. } => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
