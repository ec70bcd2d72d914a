//! Asset Registry Module
//!
//! Owns all registered media assets and drives their asynchronous loading
//! through the external decode collaborator. Callers hold asset ids only and
//! either poll `is_ready` or subscribe to the registry's event channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{
    assets::{LoadState, MediaAsset, SourceDescriptor},
    AssetId, CoreError, CoreResult, Tick,
};

// =============================================================================
// Decode Collaborator
// =============================================================================

/// Metadata produced by the decode collaborator for a ready asset
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedMedia {
    /// Source duration in ticks
    pub duration_ticks: Tick,
}

/// External media decode collaborator.
///
/// Implementations wrap whatever actually probes/decodes media (FFmpeg, a
/// test double). Slow work happens here, never in the registry.
#[async_trait]
pub trait MediaDecoder: Send + Sync {
    async fn decode(&self, source: &SourceDescriptor) -> CoreResult<DecodedMedia>;
}

// =============================================================================
// Registry Events
// =============================================================================

/// Asset lifecycle event
#[derive(Clone, Debug)]
pub enum AssetEvent {
    /// Asset finished loading and is usable on the timeline
    Ready { asset_id: AssetId },
    /// Decode collaborator reported failure
    Failed { asset_id: AssetId, reason: String },
}

// =============================================================================
// Asset Registry
// =============================================================================

/// Owns media assets and their loading lifecycle
pub struct AssetRegistry {
    assets: Arc<Mutex<HashMap<AssetId, MediaAsset>>>,
    decoder: Arc<dyn MediaDecoder>,
    event_tx: mpsc::UnboundedSender<AssetEvent>,
    event_rx: Option<mpsc::UnboundedReceiver<AssetEvent>>,
}

impl AssetRegistry {
    /// Creates a new registry backed by the given decode collaborator
    pub fn new(decoder: Arc<dyn MediaDecoder>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            assets: Arc::new(Mutex::new(HashMap::new())),
            decoder,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Registers a media source and starts loading it.
    ///
    /// Returns the new asset id immediately; the asset stays in the
    /// `Loading` state until the decode collaborator finishes. Failures
    /// surface as `LoadState::Failed` plus an [`AssetEvent::Failed`] on the
    /// event channel.
    pub fn register(&self, source: SourceDescriptor) -> AssetId {
        let asset = MediaAsset::loading(&source);
        let asset_id = asset.id.clone();

        self.assets
            .lock()
            .expect("asset registry lock poisoned")
            .insert(asset_id.clone(), asset);

        let assets = Arc::clone(&self.assets);
        let decoder = Arc::clone(&self.decoder);
        let event_tx = self.event_tx.clone();
        let id = asset_id.clone();

        tokio::spawn(async move {
            let outcome = decoder.decode(&source).await;
            let mut assets = assets.lock().expect("asset registry lock poisoned");
            let Some(asset) = assets.get_mut(&id) else {
                // Asset was removed while loading; nothing to update.
                return;
            };

            match outcome {
                Ok(decoded) => {
                    asset.duration_ticks = decoded.duration_ticks;
                    asset.load_state = LoadState::Ready;
                    tracing::info!(asset_id = %id, duration_ticks = decoded.duration_ticks, "asset ready");
                    let _ = event_tx.send(AssetEvent::Ready { asset_id: id });
                }
                Err(err) => {
                    let reason = err.to_string();
                    asset.load_state = LoadState::Failed {
                        reason: reason.clone(),
                    };
                    tracing::warn!(asset_id = %id, %reason, "asset load failed");
                    let _ = event_tx.send(AssetEvent::Failed {
                        asset_id: id,
                        reason,
                    });
                }
            }
        });

        asset_id
    }

    /// Gets a ready asset by id.
    ///
    /// Fails with `AssetNotFound` when the id is unknown or the asset has
    /// not finished loading.
    pub fn get(&self, asset_id: &str) -> CoreResult<MediaAsset> {
        let assets = self.assets.lock().expect("asset registry lock poisoned");
        match assets.get(asset_id) {
            Some(asset) if asset.is_ready() => Ok(asset.clone()),
            _ => Err(CoreError::AssetNotFound(asset_id.to_string())),
        }
    }

    /// Returns true if the asset exists and finished loading successfully
    pub fn is_ready(&self, asset_id: &str) -> bool {
        self.assets
            .lock()
            .expect("asset registry lock poisoned")
            .get(asset_id)
            .map(|a| a.is_ready())
            .unwrap_or(false)
    }

    /// Returns the load state of an asset, if registered
    pub fn load_state(&self, asset_id: &str) -> Option<LoadState> {
        self.assets
            .lock()
            .expect("asset registry lock poisoned")
            .get(asset_id)
            .map(|a| a.load_state.clone())
    }

    /// Number of registered assets (any state)
    pub fn len(&self) -> usize {
        self.assets.lock().expect("asset registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<AssetEvent>> {
        self.event_rx.take()
    }
}

// =============================================================================
// Tests
// =============================================================================
