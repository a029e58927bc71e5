//! Results of a pipeline run.

use std::path::PathBuf;

use lf_core::{CommandId, ItemId, RunId, RunMode};
use serde::Serialize;

use crate::context::{DeferredAction, ExecutionMode};

/// What happened to one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// Every applicable command ran.
    Processed,
    /// A condition did not match.
    Excluded { command: String },
    /// The item was left alone: a validation problem or an existing file.
    Skipped { reason: String },
    /// A recoverable action failure.
    Failed { command: String, error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub item_id: ItemId,
    pub original_name: String,
    pub name: String,
    pub output: Option<PathBuf>,
    pub status: ItemStatus,
    /// Actions that completed for this item, in order.
    pub applied: Vec<CommandId>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub deferred: Vec<DeferredAction>,
}

impl ItemOutcome {
    pub fn is_included(&self) -> bool {
        !matches!(self.status, ItemStatus::Excluded { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Cancelled,
    Aborted {
        command: String,
        item: ItemId,
        message: String,
    },
}

/// A command that could not complete for an item.
#[derive(Debug, Clone, Serialize)]
pub struct CommandIssue {
    pub command_id: CommandId,
    pub command: String,
    pub item: ItemId,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub run_id: RunId,
    pub mode: ExecutionMode,
    pub run_mode: RunMode,
    pub status: RunStatus,
    /// One outcome per visited item, in traversal order.
    pub items: Vec<ItemOutcome>,
    pub failed_commands: Vec<CommandIssue>,
    pub skipped_commands: Vec<CommandIssue>,
}

impl ExecutionReport {
    pub fn new(mode: ExecutionMode, run_mode: RunMode) -> Self {
        Self {
            run_id: RunId::new(),
            mode,
            run_mode,
            status: RunStatus::Completed,
            items: Vec::new(),
            failed_commands: Vec::new(),
            skipped_commands: Vec::new(),
        }
    }

    fn count(&self, f: impl Fn(&ItemStatus) -> bool) -> usize {
        self.items.iter().filter(|o| f(&o.status)).count()
    }

    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Processed))
    }

    pub fn excluded(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Excluded { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed { .. }))
    }

    pub fn outcome(&self, item: ItemId) -> Option<&ItemOutcome> {
        self.items.iter().find(|o| o.item_id == item)
    }

    /// Output paths written (or planned, in preview mode), in order.
    pub fn outputs(&self) -> Vec<&PathBuf> {
        self.items.iter().filter_map(|o| o.output.as_ref()).collect()
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.status, RunStatus::Aborted { .. })
    }

    /// Completed without failed items.
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Completed && self.failed() == 0
    }
}
