//! Command Executor Module
//!
//! Handles command execution, undo/redo history, and transactions. This is
//! the central hub for all timeline-mutating operations: the single editing
//! task routes every edit through here, and observers learn about mutations
//! from the executor's event channel.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::core::{
    commands::{Command, CommandResult, StateChange},
    timeline::Timeline,
    CoreError, CoreResult, OpId,
};

type SharedCommand = Arc<Mutex<Box<dyn Command>>>;

// =============================================================================
// Timeline Events
// =============================================================================

/// Change notification emitted after every atomic timeline mutation.
///
/// Observers (UI, export snapshotting) key on `version`; `changes` carries
/// the detail for applied commands and is empty for undo/redo, where
/// observers re-read the timeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub version: u64,
    pub changes: Vec<StateChange>,
}

// =============================================================================
// History Entry
// =============================================================================

/// Entry in the undo/redo history.
///
/// Holds one command normally, several when a transaction was committed as
/// a single undoable step.
pub struct HistoryEntry {
    /// Operation ID
    pub op_id: OpId,
    /// Commands in execution order (wrapped for interior mutability)
    commands: Vec<SharedCommand>,
    /// Merged result from command execution
    pub result: CommandResult,
    /// Timestamp when the entry was recorded
    pub timestamp: String,
}

impl std::fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("op_id", &self.op_id)
            .field("commands", &self.commands.len())
            .field("result", &self.result)
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

impl HistoryEntry {
    fn new(commands: Vec<SharedCommand>, result: CommandResult) -> Self {
        Self {
            op_id: result.op_id.clone(),
            commands,
            result,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

// =============================================================================
// Command Executor
// =============================================================================

/// Executes commands and manages undo/redo history
pub struct CommandExecutor {
    /// Undo stack
    undo_stack: VecDeque<HistoryEntry>,
    /// Redo stack
    redo_stack: VecDeque<HistoryEntry>,
    /// Maximum history size
    max_history_size: usize,
    /// Sub-edits of an open transaction, in execution order
    transaction: Option<Vec<(SharedCommand, CommandResult)>>,
    /// Event sender
    event_tx: mpsc::UnboundedSender<TimelineEvent>,
    /// Event receiver
    event_rx: Option<mpsc::UnboundedReceiver<TimelineEvent>>,
}

impl CommandExecutor {
    /// Creates a new command executor
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_history_size: 100,
            transaction: None,
            event_tx,
            event_rx: Some(event_rx),
        }
    }

    /// Sets the maximum history size
    pub fn with_max_history(mut self, size: usize) -> Self {
        self.max_history_size = size;
        self
    }

    /// Takes the event receiver (can only be called once)
    pub fn take_event_receiver(&mut self) -> Option<mpsc::UnboundedReceiver<TimelineEvent>> {
        self.event_rx.take()
    }

    /// Executes a command.
    ///
    /// Outside a transaction the command becomes a new history entry and
    /// the redo tail is truncated. Inside a transaction the command joins
    /// the pending batch and only reaches history on commit.
    pub fn execute(
        &mut self,
        mut command: Box<dyn Command>,
        timeline: &mut Timeline,
    ) -> CoreResult<CommandResult> {
        tracing::debug!(
            command = command.type_name(),
            payload = %command.to_json(),
            "executing command"
        );

        let result = command.execute(timeline)?;
        let shared: SharedCommand = Arc::new(Mutex::new(command));

        if let Some(pending) = &mut self.transaction {
            pending.push((shared, result.clone()));
        } else {
            // A new command invalidates the redo tail
            self.redo_stack.clear();
            self.push_entry(HistoryEntry::new(vec![shared], result.clone()));
        }

        self.notify(timeline, result.changes.clone());
        Ok(result)
    }

    /// Undoes the most recent history entry.
    ///
    /// Returns `Ok(false)` when there is nothing to undo; an empty history
    /// is not an error. Batched entries are undone in reverse order.
    pub fn undo(&mut self, timeline: &mut Timeline) -> CoreResult<bool> {
        if self.transaction.is_some() {
            return Err(CoreError::TransactionInProgress);
        }

        let Some(entry) = self.undo_stack.pop_back() else {
            return Ok(false);
        };

        for shared in entry.commands.iter().rev() {
            let command = shared
                .lock()
                .map_err(|_| CoreError::Internal("failed to lock command for undo".into()))?;
            command.undo(timeline)?;
        }

        self.redo_stack.push_back(entry);
        self.notify(timeline, vec![]);
        Ok(true)
    }

    /// Re-applies the most recently undone entry.
    ///
    /// Returns `Ok(false)` when there is nothing to redo.
    pub fn redo(&mut self, timeline: &mut Timeline) -> CoreResult<bool> {
        if self.transaction.is_some() {
            return Err(CoreError::TransactionInProgress);
        }

        let Some(entry) = self.redo_stack.pop_back() else {
            return Ok(false);
        };

        let mut changes = vec![];
        for shared in &entry.commands {
            let mut command = shared
                .lock()
                .map_err(|_| CoreError::Internal("failed to lock command for redo".into()))?;
            let result = command.redo(timeline)?;
            changes.extend(result.changes);
        }

        self.undo_stack.push_back(entry);
        self.notify(timeline, changes);
        Ok(true)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Opens a transaction: subsequent commands batch into one undoable
    /// entry. Continuous gestures (drags) commit once on release.
    pub fn begin_transaction(&mut self) -> CoreResult<()> {
        if self.transaction.is_some() {
            return Err(CoreError::TransactionInProgress);
        }
        self.transaction = Some(vec![]);
        Ok(())
    }

    /// Commits the open transaction as a single history entry.
    ///
    /// An empty transaction leaves history untouched.
    pub fn commit_transaction(&mut self) -> CoreResult<()> {
        let pending = self
            .transaction
            .take()
            .ok_or(CoreError::NoActiveTransaction)?;

        if pending.is_empty() {
            return Ok(());
        }

        let mut merged = CommandResult::new();
        let mut commands = Vec::with_capacity(pending.len());
        for (command, result) in pending {
            commands.push(command);
            merged.changes.extend(result.changes);
            merged.created_ids.extend(result.created_ids);
            merged.deleted_ids.extend(result.deleted_ids);
        }

        self.redo_stack.clear();
        self.push_entry(HistoryEntry::new(commands, merged));
        Ok(())
    }

    /// Aborts the open transaction, replaying inverses in reverse order.
    /// The partial effects are discarded; no history entry is recorded.
    pub fn abort_transaction(&mut self, timeline: &mut Timeline) -> CoreResult<()> {
        let pending = self
            .transaction
            .take()
            .ok_or(CoreError::NoActiveTransaction)?;

        for (shared, _) in pending.iter().rev() {
            let command = shared
                .lock()
                .map_err(|_| CoreError::Internal("failed to lock command for abort".into()))?;
            command.undo(timeline)?;
        }

        self.notify(timeline, vec![]);
        Ok(())
    }

    /// Returns true while a transaction is open
    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns true if undo is available
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if redo is available
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of entries in the undo stack
    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    /// Number of entries in the redo stack
    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clears all history (undo and redo)
    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.max_history_size {
            self.undo_stack.pop_front();
        }
    }

    fn notify(&self, timeline: &Timeline, changes: Vec<StateChange>) {
        let _ = self.event_tx.send(TimelineEvent {
            version: timeline.version,
            changes,
        });
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
