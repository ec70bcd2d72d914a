//! Command Trait Definition
//!
//! Defines the trait that all edit commands must implement.

use serde::{Deserialize, Serialize};

use crate::core::{timeline::Timeline, CoreResult, OpId};

/// Command execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult {
    /// Generated Operation ID
    pub op_id: OpId,

    /// List of state changes
    pub changes: Vec<StateChange>,

    /// Newly created IDs (elements, tracks, etc.)
    pub created_ids: Vec<String>,

    /// Deleted IDs
    pub deleted_ids: Vec<String>,
}

impl CommandResult {
    /// Creates a new empty command result with a fresh operation ID
    pub fn new() -> Self {
        Self {
            op_id: ulid::Ulid::new().to_string(),
            changes: vec![],
            created_ids: vec![],
            deleted_ids: vec![],
        }
    }

    /// Adds a state change
    pub fn with_change(mut self, change: StateChange) -> Self {
        self.changes.push(change);
        self
    }

    /// Adds a created ID
    pub fn with_created_id(mut self, id: &str) -> Self {
        self.created_ids.push(id.to_string());
        self
    }

    /// Adds a deleted ID
    pub fn with_deleted_id(mut self, id: &str) -> Self {
        self.deleted_ids.push(id.to_string());
        self
    }
}

impl Default for CommandResult {
    fn default() -> Self {
        Self::new()
    }
}

/// State change types, consumed by timeline observers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateChange {
    ElementCreated { element_id: String },
    ElementModified { element_id: String },
    ElementDeleted { element_id: String },
    TrackCreated { track_id: String },
    TrackModified { track_id: String },
    TrackDeleted { track_id: String },
    TracksReordered,
    CaptionTrackInstalled { caption_track_id: String },
}

/// Trait that all edit commands must implement
///
/// # Core Principles
/// - All timeline mutations must go through Commands.
/// - All Commands must be undoable.
/// - Commands must be serializable (for structured logging).
///
/// `execute` uses `&mut self` so the command can capture the displaced old
/// state for its inverse. On failure, the timeline must remain unchanged.
pub trait Command: Send + Sync {
    /// Execute the command.
    ///
    /// Modifies the timeline and returns the result.
    /// On failure, the timeline must remain unchanged.
    fn execute(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult>;

    /// Undo the command.
    ///
    /// Inverse operation of execute. Only called after execute succeeds.
    fn undo(&self, timeline: &mut Timeline) -> CoreResult<()>;

    /// Redo the command.
    ///
    /// Default implementation is identical to execute.
    fn redo(&mut self, timeline: &mut Timeline) -> CoreResult<CommandResult> {
        self.execute(timeline)
    }

    /// Command type name, used for logging and debugging
    fn type_name(&self) -> &'static str;

    /// JSON serialization of the command parameters
    fn to_json(&self) -> serde_json::Value;
}
