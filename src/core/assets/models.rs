//! Media Asset Models
//!
//! Defines media asset data structures. Assets hold opaque metadata about
//! decoded media; the actual bytes stay with the decode collaborator.
//! Timeline elements reference assets by id only.

use serde::{Deserialize, Serialize};

use crate::core::{AssetId, Tick};

// =============================================================================
// Asset Kind
// =============================================================================

/// Media asset kind enumeration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

// =============================================================================
// Load State
// =============================================================================

/// Asynchronous loading state of an asset
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum LoadState {
    /// Decode collaborator is still working
    Loading,
    /// Metadata available, asset usable on the timeline
    Ready,
    /// Decode collaborator reported failure
    Failed { reason: String },
}

// =============================================================================
// Source Descriptor
// =============================================================================

/// Opaque description of a media source handed to the decode collaborator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceDescriptor {
    /// Source location (file path or URL, interpreted by the collaborator)
    pub uri: String,
    /// Expected media kind
    pub kind: AssetKind,
}

impl SourceDescriptor {
    pub fn new(uri: &str, kind: AssetKind) -> Self {
        Self {
            uri: uri.to_string(),
            kind,
        }
    }
}

// =============================================================================
// Media Asset
// =============================================================================

/// A registered media asset.
///
/// Immutable once `Ready`; owned exclusively by the [`AssetRegistry`].
///
/// [`AssetRegistry`]: crate::core::assets::AssetRegistry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    pub id: AssetId,
    pub kind: AssetKind,
    /// Display name, derived from the source descriptor
    pub name: String,
    /// Duration in ticks; 0 until the asset is Ready (images report the
    /// duration chosen by the decoder)
    pub duration_ticks: Tick,
    pub load_state: LoadState,
    pub created_at: String,
}

impl MediaAsset {
    /// Creates a new asset in the Loading state
    pub fn loading(source: &SourceDescriptor) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            kind: source.kind,
            name: source.uri.clone(),
            duration_ticks: 0,
            load_state: LoadState::Loading,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Returns true once the decode collaborator reported success
    pub fn is_ready(&self) -> bool {
        self.load_state == LoadState::Ready
    }
}

// =============================================================================
// Tests
// =============================================================================
