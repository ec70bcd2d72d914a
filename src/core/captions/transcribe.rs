//! Transcription Subsystem
//!
//! Tracks asynchronous transcription jobs driven by the external
//! transcription collaborator. The subsystem only manages job state: on
//! completion it builds a caption track from the collaborator's cue list
//! and hands it to the editing thread over its event channel, where a
//! normal `InstallCaptionTrackCommand` makes the installation undoable.
//! Failures are recorded on the job and never touch the timeline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::core::{
    captions::{Caption, CaptionTrack},
    AssetId, CaptionTrackId, CoreError, CoreResult, JobId, Tick,
};

// =============================================================================
// Collaborator Interface
// =============================================================================

/// A raw timed text span produced by the transcription collaborator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptCue {
    pub start_tick: Tick,
    pub end_tick: Tick,
    pub text: String,
}

/// Progress update streamed by the transcription collaborator
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptionUpdate {
    Queued,
    Running,
    Completed {
        cues: Vec<TranscriptCue>,
        language: String,
    },
    Failed {
        reason: String,
    },
}

/// External transcription collaborator (network service, local model).
///
/// Returns a stream of updates terminating in `Completed` or `Failed`.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    async fn transcribe(
        &self,
        asset_id: &str,
    ) -> CoreResult<mpsc::UnboundedReceiver<TranscriptionUpdate>>;
}

// =============================================================================
// Transcription Job
// =============================================================================

/// Transcription job state machine: `Queued → Running → Completed | Failed`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TranscriptionState {
    Queued,
    Running,
    Completed,
    Failed { reason: String },
}

impl TranscriptionState {
    /// Queued and Running jobs block new requests for the same asset
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Queued | Self::Running)
    }
}

/// A tracked transcription job
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionJob {
    pub id: JobId,
    pub source_asset_id: AssetId,
    pub state: TranscriptionState,
    /// Caption track produced on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_caption_track_id: Option<CaptionTrackId>,
    pub created_at: String,
    pub completed_at: Option<String>,
}

impl TranscriptionJob {
    fn new(source_asset_id: &str) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            source_asset_id: source_asset_id.to_string(),
            state: TranscriptionState::Queued,
            result_caption_track_id: None,
            created_at: chrono::Utc::now().to_rfc3339(),
            completed_at: None,
        }
    }
}

// =============================================================================
// Service Events
// =============================================================================

/// Transcription lifecycle event
#[derive(Clone, Debug)]
pub enum TranscriptionEvent {
    /// Job state changed
    StateChanged {
        job_id: JobId,
        state: TranscriptionState,
    },
    /// A finished caption track is ready for installation.
    ///
    /// The consumer on the editing thread installs it through an
    /// `InstallCaptionTrackCommand`.
    TrackReady {
        job_id: JobId,
        source_asset_id: AssetId,
        track: CaptionTrack,
    },
}

// =============================================================================
// Transcription Service
// =============================================================================

/// Manages transcription jobs and their consumer tasks
pub struct TranscriptionService {
    jobs: Arc<Mutex<HashMap<JobId, TranscriptionJob>>>,
    provider: Arc<dyn TranscriptionProvider>,
    event_tx: mpsc::UnboundedSender<TranscriptionEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<TranscriptionEvent>>,
}

impl TranscriptionService {
    /// Creates a new service backed by the given collaborator
    pub fn new(provider: Arc<dyn TranscriptionProvider>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            provider,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Requests transcription of an asset.
    ///
    /// At most one job per asset may be Queued or Running; a second request
    /// while one is active fails with `JobAlreadyActive`. Requests for
    /// other assets are unaffected.
    pub fn request(&self, asset_id: &str) -> CoreResult<JobId> {
        let job = {
            let mut jobs = self.jobs.lock().expect("transcription jobs lock poisoned");
            if jobs
                .values()
                .any(|j| j.source_asset_id == asset_id && j.state.is_active())
            {
                return Err(CoreError::JobAlreadyActive(asset_id.to_string()));
            }
            let job = TranscriptionJob::new(asset_id);
            jobs.insert(job.id.clone(), job.clone());
            job
        };

        tracing::info!(job_id = %job.id, asset_id, "transcription requested");

        let jobs = Arc::clone(&self.jobs);
        let provider = Arc::clone(&self.provider);
        let event_tx = self.event_tx.clone();
        let job_id = job.id.clone();
        let asset = asset_id.to_string();

        tokio::spawn(async move {
            let mut updates = match provider.transcribe(&asset).await {
                Ok(rx) => rx,
                Err(err) => {
                    finish_job(
                        &jobs,
                        &event_tx,
                        &job_id,
                        TranscriptionState::Failed {
                            reason: err.to_string(),
                        },
                        None,
                    );
                    return;
                }
            };

            while let Some(update) = updates.recv().await {
                match update {
                    TranscriptionUpdate::Queued => {
                        // Jobs start out Queued; nothing to do.
                    }
                    TranscriptionUpdate::Running => {
                        transition_job(&jobs, &event_tx, &job_id, TranscriptionState::Running);
                    }
                    TranscriptionUpdate::Completed { cues, language } => {
                        let track = build_caption_track(cues, &language);
                        finish_job(
                            &jobs,
                            &event_tx,
                            &job_id,
                            TranscriptionState::Completed,
                            Some(track.id.clone()),
                        );
                        let _ = event_tx.send(TranscriptionEvent::TrackReady {
                            job_id: job_id.clone(),
                            source_asset_id: asset.clone(),
                            track,
                        });
                        return;
                    }
                    TranscriptionUpdate::Failed { reason } => {
                        finish_job(
                            &jobs,
                            &event_tx,
                            &job_id,
                            TranscriptionState::Failed { reason },
                            None,
                        );
                        return;
                    }
                }
            }

            // Stream ended without a terminal update
            finish_job(
                &jobs,
                &event_tx,
                &job_id,
                TranscriptionState::Failed {
                    reason: "transcription stream ended unexpectedly".to_string(),
                },
                None,
            );
        });

        Ok(job.id)
    }

    /// Gets a job by id
    pub fn job(&self, job_id: &str) -> Option<TranscriptionJob> {
        self.jobs
            .lock()
            .expect("transcription jobs lock poisoned")
            .get(job_id)
            .cloned()
    }

    /// All tracked jobs (any state)
    pub fn jobs(&self) -> Vec<TranscriptionJob> {
        self.jobs
            .lock()
            .expect("transcription jobs lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Returns true if a job for the asset is Queued or Running
    pub fn has_active(&self, asset_id: &str) -> bool {
        self.jobs
            .lock()
            .expect("transcription jobs lock poisoned")
            .values()
            .any(|j| j.source_asset_id == asset_id && j.state.is_active())
    }

    /// Takes the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TranscriptionEvent>> {
        self.event_rx.take()
    }
}

fn transition_job(
    jobs: &Arc<Mutex<HashMap<JobId, TranscriptionJob>>>,
    event_tx: &mpsc::UnboundedSender<TranscriptionEvent>,
    job_id: &str,
    state: TranscriptionState,
) {
    let mut jobs = jobs.lock().expect("transcription jobs lock poisoned");
    let Some(job) = jobs.get_mut(job_id) else {
        return;
    };
    if !job.state.is_active() {
        warn!(job_id, ?state, "ignoring transition on finished transcription job");
        return;
    }
    job.state = state.clone();
    let _ = event_tx.send(TranscriptionEvent::StateChanged {
        job_id: job_id.to_string(),
        state,
    });
}

fn finish_job(
    jobs: &Arc<Mutex<HashMap<JobId, TranscriptionJob>>>,
    event_tx: &mpsc::UnboundedSender<TranscriptionEvent>,
    job_id: &str,
    state: TranscriptionState,
    result_caption_track_id: Option<CaptionTrackId>,
) {
    let mut jobs = jobs.lock().expect("transcription jobs lock poisoned");
    let Some(job) = jobs.get_mut(job_id) else {
        return;
    };
    if !job.state.is_active() {
        warn!(job_id, ?state, "ignoring transition on finished transcription job");
        return;
    }
    job.state = state.clone();
    job.completed_at = Some(chrono::Utc::now().to_rfc3339());
    job.result_caption_track_id = result_caption_track_id;
    let _ = event_tx.send(TranscriptionEvent::StateChanged {
        job_id: job_id.to_string(),
        state,
    });
}

/// Builds a caption track from raw collaborator cues.
///
/// Cues are sorted by start; a cue starting before the previous one ends is
/// clamped forward, and cues left empty by clamping are dropped.
fn build_caption_track(mut cues: Vec<TranscriptCue>, language: &str) -> CaptionTrack {
    cues.sort_by_key(|c| c.start_tick);

    let mut track = CaptionTrack::new("Transcript", language);
    let mut prev_end: Tick = 0;
    for cue in cues {
        let start = cue.start_tick.max(prev_end).max(0);
        if cue.end_tick <= start {
            warn!(
                start_tick = cue.start_tick,
                end_tick = cue.end_tick,
                "dropping overlapping transcript cue"
            );
            continue;
        }
        prev_end = cue.end_tick;
        // Cannot fail: starts are clamped past the previous end.
        let _ = track.add_cue(Caption::create(start, cue.end_tick, &cue.text));
    }
    track
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Provider that hands out a pre-scripted update stream
    struct ScriptedProvider {
        updates: Mutex<Vec<Vec<TranscriptionUpdate>>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Vec<TranscriptionUpdate>>) -> Self {
            Self {
                updates: Mutex::new(scripts),
            }
        }
    }

    #[async_trait]
    impl TranscriptionProvider for ScriptedProvider {
        async fn transcribe(
            &self,
            _asset_id: &str,
        ) -> CoreResult<mpsc::UnboundedReceiver<TranscriptionUpdate>> {
            let script = self
                .updates
                .lock()
                .unwrap()
                .pop()
                .expect("no script left for transcribe call");
            let (tx, rx) = mpsc::unbounded_channel();
            for update in script {
                let _ = tx.send(update);
            }
            Ok(rx)
        }
    }

    fn completed_script(cues: Vec<TranscriptCue>) -> Vec<TranscriptionUpdate> {
        vec![
            TranscriptionUpdate::Queued,
            TranscriptionUpdate::Running,
            TranscriptionUpdate::Completed {
                cues,
                language: "en".to_string(),
            },
        ]
    }

    async fn wait_terminal(service: &TranscriptionService, job_id: &str) -> TranscriptionJob {
        for _ in 0..100 {
            if let Some(job) = service.job(job_id) {
                if !job.state.is_active() {
                    return job;
                }
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    #[tokio::test]
    async fn test_completed_job_produces_caption_track() {
        let provider = ScriptedProvider::new(vec![completed_script(vec![
            TranscriptCue {
                start_tick: 0,
                end_tick: 600,
                text: "hello".to_string(),
            },
            TranscriptCue {
                start_tick: 700,
                end_tick: 1200,
                text: "world".to_string(),
            },
        ])]);
        let mut service = TranscriptionService::new(Arc::new(provider));
        let mut events = service.take_event_receiver().unwrap();

        let job_id = service.request("asset_1").unwrap();
        let job = wait_terminal(&service, &job_id).await;

        assert_eq!(job.state, TranscriptionState::Completed);
        assert!(job.result_caption_track_id.is_some());
        assert!(job.completed_at.is_some());

        // Running → Completed → TrackReady
        let mut saw_track = None;
        while let Ok(event) = events.try_recv() {
            if let TranscriptionEvent::TrackReady { track, .. } = event {
                saw_track = Some(track);
            }
        }
        let track = saw_track.expect("no TrackReady event");
        assert_eq!(track.id, job.result_caption_track_id.unwrap());
        assert_eq!(track.cues.len(), 2);
        assert_eq!(track.language, "en");
    }

    #[tokio::test]
    async fn test_failed_job_records_reason() {
        let provider = ScriptedProvider::new(vec![vec![
            TranscriptionUpdate::Running,
            TranscriptionUpdate::Failed {
                reason: "service unavailable".to_string(),
            },
        ]]);
        let mut service = TranscriptionService::new(Arc::new(provider));
        let mut events = service.take_event_receiver().unwrap();

        let job_id = service.request("asset_1").unwrap();
        let job = wait_terminal(&service, &job_id).await;

        assert_eq!(
            job.state,
            TranscriptionState::Failed {
                reason: "service unavailable".to_string()
            }
        );
        assert!(job.result_caption_track_id.is_none());

        // A failed job never produces a caption track
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, TranscriptionEvent::TrackReady { .. }));
        }
    }

    #[tokio::test]
    async fn test_one_active_job_per_asset() {
        // Provider whose stream stays open until the test drops the sender
        struct HangingProvider {
            tx: Mutex<Option<mpsc::UnboundedSender<TranscriptionUpdate>>>,
        }

        #[async_trait]
        impl TranscriptionProvider for HangingProvider {
            async fn transcribe(
                &self,
                _asset_id: &str,
            ) -> CoreResult<mpsc::UnboundedReceiver<TranscriptionUpdate>> {
                let (tx, rx) = mpsc::unbounded_channel();
                let _ = tx.send(TranscriptionUpdate::Running);
                *self.tx.lock().unwrap() = Some(tx);
                Ok(rx)
            }
        }

        let provider = Arc::new(HangingProvider {
            tx: Mutex::new(None),
        });
        let service = TranscriptionService::new(provider.clone());

        let job_id = service.request("asset_1").unwrap();

        // Give the consumer task a moment to observe Running
        for _ in 0..100 {
            if service.has_active("asset_1") {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        // Second request for the same asset is rejected
        assert!(matches!(
            service.request("asset_1"),
            Err(CoreError::JobAlreadyActive(_))
        ));

        // A different asset is unaffected; consume its sender so the stream
        // ends and the job finishes.
        service.request("asset_2").unwrap();

        // Ending the first stream without a terminal update fails the job
        drop(provider.tx.lock().unwrap().take());
        let job = wait_terminal(&service, &job_id).await;
        assert!(matches!(job.state, TranscriptionState::Failed { .. }));

        // With no active job, the asset can be requested again
        assert!(!service.has_active("asset_1"));
    }

    #[tokio::test]
    async fn test_collaborator_error_fails_job() {
        struct ErrorProvider;

        #[async_trait]
        impl TranscriptionProvider for ErrorProvider {
            async fn transcribe(
                &self,
                _asset_id: &str,
            ) -> CoreResult<mpsc::UnboundedReceiver<TranscriptionUpdate>> {
                Err(CoreError::Internal("no credentials".to_string()))
            }
        }

        let service = TranscriptionService::new(Arc::new(ErrorProvider));
        let job_id = service.request("asset_1").unwrap();
        let job = wait_terminal(&service, &job_id).await;

        match job.state {
            TranscriptionState::Failed { reason } => assert!(reason.contains("no credentials")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_build_caption_track_clamps_overlaps() {
        let track = build_caption_track(
            vec![
                TranscriptCue {
                    start_tick: 500,
                    end_tick: 900,
                    text: "b".to_string(),
                },
                TranscriptCue {
                    start_tick: 0,
                    end_tick: 600,
                    text: "a".to_string(),
                },
                TranscriptCue {
                    start_tick: 550,
                    end_tick: 700,
                    text: "swallowed".to_string(),
                },
            ],
            "en",
        );

        // Sorted, clamped forward, fully-covered cue dropped
        assert_eq!(track.cues.len(), 2);
        assert_eq!(track.cues[0].text, "a");
        assert_eq!(track.cues[1].text, "b");
        assert_eq!(track.cues[1].start_tick, 600);
        assert_eq!(track.cues[1].end_tick, 900);
    }
}
