//! Export Pipeline Module
//!
//! Renders a timeline snapshot to a media file through the external
//! render/encode collaborator. The pipeline owns an immutable snapshot
//! taken at submission, so edits made while an export runs never affect it.
//!
//! Cancellation is cooperative: the flag is checked between frame
//! boundaries only, so the collaborator never sees a partially written
//! frame, and buffered output is flushed before the job ends.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::core::{
    frame_to_ticks, ticks_to_frames,
    timeline::{Element, SourceRef, Timeline, TrackKind},
    CoreError, CoreResult, Frame, JobId, Ratio, Tick, TrackId,
};

// =============================================================================
// Collaborator Interface
// =============================================================================

/// Render/encode error reported by the collaborator
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("frame render failed: {0}")]
    Frame(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("finalize failed: {0}")]
    Finalize(String),
}

/// A composited frame produced by the render collaborator.
///
/// The pipeline treats the payload as opaque; an empty payload is the
/// black/silence fallback frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameBuffer {
    pub frame: Frame,
    pub data: Vec<u8>,
}

impl FrameBuffer {
    /// The black/silence fallback substituted for an unrenderable frame
    pub fn blank(frame: Frame) -> Self {
        Self {
            frame,
            data: vec![],
        }
    }
}

/// An element active at a frame, resolved for the render collaborator.
/// Ordered by track: z-order for video, mix order for audio.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveElement {
    pub track_id: TrackId,
    pub track_kind: TrackKind,
    pub element: Element,
    /// Resolved cue text for caption elements
    pub caption_text: Option<String>,
}

/// External render/encode collaborator.
///
/// `render_frame` composites the active elements at a timestamp, `encode`
/// appends the frame to the output, `finalize` flushes and closes it.
#[async_trait]
pub trait FrameRenderer: Send + Sync {
    async fn render_frame(
        &self,
        elements: &[ActiveElement],
        timestamp_tick: Tick,
    ) -> Result<FrameBuffer, RenderError>;

    async fn encode(&self, frame: FrameBuffer) -> Result<(), RenderError>;

    async fn finalize(&self) -> Result<(), RenderError>;
}

// =============================================================================
// Settings and Job State
// =============================================================================

/// Export settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    /// Output frame rate
    pub fps: Ratio,
    /// Consecutive unrenderable frames tolerated before the job fails
    pub frame_error_threshold: u32,
    /// Number of recent frames in the moving average behind the
    /// time-remaining estimate
    pub eta_window: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            fps: Ratio::default(),
            frame_error_threshold: 3,
            eta_window: 30,
        }
    }
}

/// Export job state machine
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExportState {
    Pending,
    Rendering,
    Cancelling,
    Completed,
    Failed { error: String },
    Cancelled,
}

impl ExportState {
    /// Completed, Failed and Cancelled are terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed { .. } | Self::Cancelled
        )
    }
}

/// An export job over an immutable timeline snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportJob {
    pub id: JobId,
    /// Timeline state captured at submission; later edits never affect it
    pub snapshot: Timeline,
    pub state: ExportState,
    /// Frames fully rendered and encoded so far
    pub current_frame: Frame,
    pub total_frames: Frame,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl ExportJob {
    fn new(snapshot: Timeline, settings: &ExportSettings) -> Self {
        let total_frames = ticks_to_frames(snapshot.render_duration_ticks(), &settings.fps);
        Self {
            id: ulid::Ulid::new().to_string(),
            snapshot,
            state: ExportState::Pending,
            current_frame: 0,
            total_frames,
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }
}

// =============================================================================
// Events and Cancellation
// =============================================================================

/// Progress/state event emitted by a running export, consumable by the UI
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ExportEvent {
    #[serde(rename_all = "camelCase")]
    Progress {
        export_id: JobId,
        current_frame: Frame,
        total_frames: Frame,
        /// Moving-average estimate; absent until the first frame lands
        eta_seconds: Option<u64>,
    },
    #[serde(rename_all = "camelCase")]
    StateChanged { export_id: JobId, state: ExportState },
}

/// Cooperative cancellation flag, checked between frame boundaries
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; observed at the next frame boundary
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Handle to a running export
pub struct ExportHandle {
    /// Export job ID
    pub id: JobId,
    token: CancelToken,
    events: Option<mpsc::UnboundedReceiver<ExportEvent>>,
    join: JoinHandle<ExportJob>,
}

impl ExportHandle {
    /// Requests cooperative cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The cancellation token, shareable with other tasks
    pub fn cancel_token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Takes the event receiver (can only be called once)
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<ExportEvent>> {
        self.events.take()
    }

    /// Waits for the export task and returns the finished job
    pub async fn wait(self) -> CoreResult<ExportJob> {
        self.join
            .await
            .map_err(|e| CoreError::Internal(format!("export task panicked: {e}")))
    }
}

// =============================================================================
// Export Pipeline
// =============================================================================

/// Drives exports: one spawned task per job, each over its own snapshot
pub struct ExportPipeline {
    renderer: Arc<dyn FrameRenderer>,
    settings: ExportSettings,
}

impl ExportPipeline {
    /// Creates a pipeline around the given render/encode collaborator
    pub fn new(renderer: Arc<dyn FrameRenderer>, settings: ExportSettings) -> Self {
        Self { renderer, settings }
    }

    /// Starts an export of the given snapshot as a background task
    pub fn start(&self, snapshot: Timeline) -> ExportHandle {
        let job = ExportJob::new(snapshot, &self.settings);
        let id = job.id.clone();
        let token = CancelToken::new();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        tracing::info!(export_id = %id, total_frames = job.total_frames, "export started");

        let renderer = Arc::clone(&self.renderer);
        let settings = self.settings.clone();
        let task_token = token.clone();
        let join =
            tokio::spawn(
                async move { run_export(renderer, settings, job, event_tx, task_token).await },
            );

        ExportHandle {
            id,
            token,
            events: Some(event_rx),
            join,
        }
    }
}

async fn run_export(
    renderer: Arc<dyn FrameRenderer>,
    settings: ExportSettings,
    mut job: ExportJob,
    event_tx: mpsc::UnboundedSender<ExportEvent>,
    token: CancelToken,
) -> ExportJob {
    set_state(&mut job, ExportState::Rendering, &event_tx);

    let mut consecutive_failures: u32 = 0;
    let mut frame_costs: VecDeque<Duration> = VecDeque::with_capacity(settings.eta_window.max(1));

    for frame in 0..job.total_frames {
        // Cooperative cancellation, between frames only: flush whatever the
        // encoder buffered, then stop.
        if token.is_cancelled() {
            set_state(&mut job, ExportState::Cancelling, &event_tx);
            if let Err(err) = renderer.finalize().await {
                tracing::warn!(export_id = %job.id, error = %err, "finalize failed during cancel");
            }
            finish(&mut job, ExportState::Cancelled, &event_tx);
            return job;
        }

        let started = Instant::now();
        let tick = frame_to_ticks(frame, &settings.fps);
        let elements = active_elements(&job.snapshot, tick);

        let buffer = match renderer.render_frame(&elements, tick).await {
            Ok(buffer) => {
                consecutive_failures = 0;
                buffer
            }
            Err(first_err) => {
                tracing::warn!(export_id = %job.id, frame, error = %first_err, "frame render failed, retrying");
                match renderer.render_frame(&elements, tick).await {
                    Ok(buffer) => {
                        consecutive_failures = 0;
                        buffer
                    }
                    Err(err) => {
                        consecutive_failures += 1;
                        if consecutive_failures >= settings.frame_error_threshold {
                            finish(
                                &mut job,
                                ExportState::Failed {
                                    error: err.to_string(),
                                },
                                &event_tx,
                            );
                            return job;
                        }
                        // Recoverable: keep the output frame-accurate with
                        // black/silence in place of the failed composite.
                        tracing::warn!(export_id = %job.id, frame, error = %err, "substituting blank frame");
                        FrameBuffer::blank(frame)
                    }
                }
            }
        };

        if let Err(err) = renderer.encode(buffer).await {
            finish(
                &mut job,
                ExportState::Failed {
                    error: err.to_string(),
                },
                &event_tx,
            );
            return job;
        }

        job.current_frame = frame + 1;

        if frame_costs.len() == settings.eta_window.max(1) {
            frame_costs.pop_front();
        }
        frame_costs.push_back(started.elapsed());

        let _ = event_tx.send(ExportEvent::Progress {
            export_id: job.id.clone(),
            current_frame: job.current_frame,
            total_frames: job.total_frames,
            eta_seconds: estimate_remaining(&frame_costs, job.total_frames - job.current_frame),
        });
    }

    if let Err(err) = renderer.finalize().await {
        finish(
            &mut job,
            ExportState::Failed {
                error: err.to_string(),
            },
            &event_tx,
        );
        return job;
    }

    finish(&mut job, ExportState::Completed, &event_tx);
    job
}

fn set_state(job: &mut ExportJob, state: ExportState, event_tx: &mpsc::UnboundedSender<ExportEvent>) {
    job.state = state.clone();
    let _ = event_tx.send(ExportEvent::StateChanged {
        export_id: job.id.clone(),
        state,
    });
}

fn finish(job: &mut ExportJob, state: ExportState, event_tx: &mpsc::UnboundedSender<ExportEvent>) {
    job.completed_at = Some(chrono::Utc::now().to_rfc3339());
    tracing::info!(export_id = %job.id, state = ?state, frames = job.current_frame, "export finished");
    set_state(job, state, event_tx);
}

/// Moving average of recent per-frame wall-clock cost times frames left
fn estimate_remaining(frame_costs: &VecDeque<Duration>, frames_left: Frame) -> Option<u64> {
    if frame_costs.is_empty() {
        return None;
    }
    if frames_left <= 0 {
        return Some(0);
    }
    let total: Duration = frame_costs.iter().sum();
    let avg = total.as_secs_f64() / frame_costs.len() as f64;
    Some((avg * frames_left as f64).round() as u64)
}

/// Resolves the active elements at a tick for the render collaborator.
/// Caption elements carry their cue text so the collaborator never needs
/// timeline access.
fn active_elements(snapshot: &Timeline, tick: Tick) -> Vec<ActiveElement> {
    snapshot
        .elements_at(tick)
        .into_iter()
        .map(|(track, element)| {
            let caption_text = match (&element.source, &track.caption_track_id) {
                (SourceRef::Cue { cue_id }, Some(caption_track_id)) => snapshot
                    .get_caption_track(caption_track_id)
                    .and_then(|ct| ct.cue(cue_id))
                    .map(|cue| cue.text.clone()),
                _ => None,
            };
            ActiveElement {
                track_id: track.id.clone(),
                track_kind: track.kind,
                element: element.clone(),
                caption_text,
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::captions::{Caption, CaptionTrack};
    use crate::core::seconds_to_ticks;
    use crate::core::timeline::{Track, TrimRange};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Scripted render/encode collaborator for tests.
    ///
    /// Frame indices are derived from the timestamp at the 30fps used by
    /// every test (200 ticks per frame).
    #[derive(Default)]
    struct MockRenderer {
        encoded: Mutex<Vec<FrameBuffer>>,
        finalize_calls: AtomicUsize,
        /// Remaining render failures per frame index
        fail_render: Mutex<HashMap<Frame, u32>>,
        /// Frames whose encode fails
        fail_encode: Mutex<Vec<Frame>>,
        /// Cancel the export while encoding this frame index
        cancel_during_encode: Mutex<Option<(Frame, CancelToken)>>,
        /// Captured caption text per frame index
        captions_seen: Mutex<HashMap<Frame, Vec<String>>>,
    }

    impl MockRenderer {
        fn encoded_frames(&self) -> Vec<Frame> {
            self.encoded.lock().unwrap().iter().map(|b| b.frame).collect()
        }
    }

    #[async_trait]
    impl FrameRenderer for MockRenderer {
        async fn render_frame(
            &self,
            elements: &[ActiveElement],
            timestamp_tick: Tick,
        ) -> Result<FrameBuffer, RenderError> {
            let frame = timestamp_tick / 200;

            if let Some(remaining) = self.fail_render.lock().unwrap().get_mut(&frame) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(RenderError::Frame(format!("frame {frame} unreadable")));
                }
            }

            let texts: Vec<String> = elements
                .iter()
                .filter_map(|e| e.caption_text.clone())
                .collect();
            if !texts.is_empty() {
                self.captions_seen.lock().unwrap().insert(frame, texts);
            }

            Ok(FrameBuffer {
                frame,
                data: vec![1],
            })
        }

        async fn encode(&self, frame: FrameBuffer) -> Result<(), RenderError> {
            if self.fail_encode.lock().unwrap().contains(&frame.frame) {
                return Err(RenderError::Encode(format!(
                    "disk full at frame {}",
                    frame.frame
                )));
            }
            if let Some((at, token)) = self.cancel_during_encode.lock().unwrap().as_ref() {
                if *at == frame.frame {
                    token.cancel();
                }
            }
            self.encoded.lock().unwrap().push(frame);
            Ok(())
        }

        async fn finalize(&self) -> Result<(), RenderError> {
            self.finalize_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn snapshot_seconds(seconds: i64) -> Timeline {
        let mut timeline = Timeline::new();
        let mut track = Track::new_video("Video 1");
        track.insert_element_sorted(Element::from_asset(
            "asset",
            TrimRange::new(0, seconds_to_ticks(seconds)),
            0,
        ));
        timeline.tracks.push(track);
        timeline
    }

    async fn drain_events(handle: &mut ExportHandle) -> Vec<ExportEvent> {
        let mut rx = handle.take_events().unwrap();
        let mut events = vec![];
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn progress_frames(events: &[ExportEvent]) -> Vec<Frame> {
        events
            .iter()
            .filter_map(|e| match e {
                ExportEvent::Progress { current_frame, .. } => Some(*current_frame),
                _ => None,
            })
            .collect()
    }

    fn terminal_states(events: &[ExportEvent]) -> Vec<&ExportState> {
        events
            .iter()
            .filter_map(|e| match e {
                ExportEvent::StateChanged { state, .. } if state.is_terminal() => Some(state),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_export_emits_one_progress_event_per_frame() {
        let renderer = Arc::new(MockRenderer::default());
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        // 1 second at 30fps
        let mut handle = pipeline.start(snapshot_seconds(1));
        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.state, ExportState::Completed);
        assert_eq!(job.total_frames, 30);
        assert_eq!(job.current_frame, 30);

        let frames = progress_frames(&events);
        assert_eq!(frames, (1..=30).collect::<Vec<Frame>>());
        assert_eq!(terminal_states(&events).len(), 1);

        // No event after the terminal one
        assert!(matches!(
            events.last(),
            Some(ExportEvent::StateChanged {
                state: ExportState::Completed,
                ..
            })
        ));

        assert_eq!(renderer.encoded_frames(), (0..30).collect::<Vec<Frame>>());
        assert_eq!(renderer.finalize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_after_frame_120() {
        let renderer = Arc::new(MockRenderer::default());
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        // 10 seconds at 30fps: 300 frames total
        let mut handle = pipeline.start(snapshot_seconds(10));
        // Request cancellation while the 120th frame (index 119) encodes;
        // the pipeline observes it at the next frame boundary.
        *renderer.cancel_during_encode.lock().unwrap() =
            Some((119, handle.cancel_token()));

        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.total_frames, 300);
        assert_eq!(job.state, ExportState::Cancelled);
        assert_eq!(job.current_frame, 120);

        // Exactly 120 progress events, strictly increasing, none after the
        // terminal state
        let frames = progress_frames(&events);
        assert_eq!(frames, (1..=120).collect::<Vec<Frame>>());
        assert!(matches!(
            events.last(),
            Some(ExportEvent::StateChanged {
                state: ExportState::Cancelled,
                ..
            })
        ));

        // Cancelling flushed the encoder before the terminal state
        let state_order: Vec<ExportState> = events
            .iter()
            .filter_map(|e| match e {
                ExportEvent::StateChanged { state, .. } => Some(state.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(
            state_order,
            vec![
                ExportState::Rendering,
                ExportState::Cancelling,
                ExportState::Cancelled
            ]
        );
        assert_eq!(renderer.finalize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start_renders_nothing() {
        let renderer = Arc::new(MockRenderer::default());
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot_seconds(1));
        handle.cancel();

        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.state, ExportState::Cancelled);
        assert_eq!(job.current_frame, 0);
        assert!(progress_frames(&events).is_empty());
    }

    #[tokio::test]
    async fn test_frame_failure_recovers_on_retry() {
        let renderer = Arc::new(MockRenderer::default());
        renderer.fail_render.lock().unwrap().insert(5, 1);
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot_seconds(1));
        drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.state, ExportState::Completed);
        // The retry succeeded: every encoded frame carries real data
        assert!(renderer.encoded.lock().unwrap().iter().all(|b| !b.data.is_empty()));
    }

    #[tokio::test]
    async fn test_frame_failure_substitutes_blank_frame() {
        let renderer = Arc::new(MockRenderer::default());
        // Both the attempt and the retry fail for frame 5
        renderer.fail_render.lock().unwrap().insert(5, 2);
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot_seconds(1));
        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        // One bad frame is recoverable
        assert_eq!(job.state, ExportState::Completed);
        assert_eq!(progress_frames(&events).len(), 30);

        let encoded = renderer.encoded.lock().unwrap();
        assert!(encoded[5].data.is_empty());
        assert!(encoded[4].data == vec![1] && encoded[6].data == vec![1]);
    }

    #[tokio::test]
    async fn test_consecutive_failures_escalate_to_failed() {
        let renderer = Arc::new(MockRenderer::default());
        {
            let mut fail = renderer.fail_render.lock().unwrap();
            for frame in [5, 6, 7] {
                fail.insert(frame, 2);
            }
        }
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot_seconds(1));
        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        // Default threshold is 3 consecutive unrenderable frames
        match &job.state {
            ExportState::Failed { error } => assert!(error.contains("frame 7")),
            other => panic!("expected Failed, got {:?}", other),
        }
        // Frames 5 and 6 went out blank; frame 7 escalated before encoding
        assert_eq!(job.current_frame, 7);
        assert_eq!(progress_frames(&events), (1..=7).collect::<Vec<Frame>>());
        assert!(matches!(
            events.last(),
            Some(ExportEvent::StateChanged {
                state: ExportState::Failed { .. },
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_success_resets_consecutive_failure_count() {
        let renderer = Arc::new(MockRenderer::default());
        {
            // Unrenderable frames interleaved with good ones never reach the
            // threshold
            let mut fail = renderer.fail_render.lock().unwrap();
            for frame in [3, 5, 7, 9] {
                fail.insert(frame, 2);
            }
        }
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot_seconds(1));
        drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.state, ExportState::Completed);
    }

    #[tokio::test]
    async fn test_encode_failure_fails_job() {
        let renderer = Arc::new(MockRenderer::default());
        renderer.fail_encode.lock().unwrap().push(10);
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot_seconds(1));
        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert!(matches!(job.state, ExportState::Failed { .. }));
        assert_eq!(job.current_frame, 10);
        assert_eq!(progress_frames(&events).len(), 10);
    }

    #[tokio::test]
    async fn test_empty_timeline_completes_immediately() {
        let renderer = Arc::new(MockRenderer::default());
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(Timeline::new());
        let events = drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.state, ExportState::Completed);
        assert_eq!(job.total_frames, 0);
        assert!(progress_frames(&events).is_empty());
        assert_eq!(renderer.finalize_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_tracks_are_not_rendered() {
        let mut snapshot = snapshot_seconds(1);
        // A second, longer but disabled track must not extend the export
        let mut muted = Track::new_audio("Muted");
        muted.insert_element_sorted(Element::from_asset(
            "asset",
            TrimRange::new(0, seconds_to_ticks(5)),
            0,
        ));
        muted.enabled = false;
        snapshot.tracks.push(muted);

        let renderer = Arc::new(MockRenderer::default());
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot);
        drain_events(&mut handle).await;
        let job = handle.wait().await.unwrap();

        assert_eq!(job.total_frames, 30);
        assert_eq!(job.state, ExportState::Completed);
    }

    #[tokio::test]
    async fn test_caption_elements_resolve_cue_text() {
        let mut snapshot = snapshot_seconds(1);

        let mut cues = CaptionTrack::new("Transcript", "en");
        let cue = Caption::create(0, 400, "hello world");
        let cue_id = cue.id.clone();
        cues.add_cue(cue).unwrap();
        let cues_id = cues.id.clone();
        snapshot.caption_tracks.insert(cues_id.clone(), cues);

        let mut track = Track::new_caption("Captions", &cues_id);
        track.insert_element_sorted(Element::from_cue(&cue_id, 0, 400));
        snapshot.tracks.push(track);

        let renderer = Arc::new(MockRenderer::default());
        let pipeline = ExportPipeline::new(renderer.clone(), ExportSettings::default());

        let mut handle = pipeline.start(snapshot);
        drain_events(&mut handle).await;
        handle.wait().await.unwrap();

        // The cue spans frames 0 and 1 (400 ticks at 200 ticks per frame)
        let seen = renderer.captions_seen.lock().unwrap();
        assert_eq!(seen.get(&0), Some(&vec!["hello world".to_string()]));
        assert_eq!(seen.get(&1), Some(&vec!["hello world".to_string()]));
        assert!(!seen.contains_key(&2));
    }

    #[test]
    fn test_estimate_remaining() {
        let mut costs = VecDeque::new();
        assert_eq!(estimate_remaining(&costs, 10), None);

        costs.push_back(Duration::from_millis(100));
        costs.push_back(Duration::from_millis(300));
        // 200ms average, 10 frames left: 2 seconds
        assert_eq!(estimate_remaining(&costs, 10), Some(2));
        assert_eq!(estimate_remaining(&costs, 0), Some(0));
    }
}
