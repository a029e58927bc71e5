//! Per-item state and the execution context handed to actions.

use std::path::PathBuf;

use lf_core::{ArgMap, CommandId, ItemId, ItemKind, OverwriteMode, TraversalMode};
use lf_items::{Host, ItemTree, Visit};
use lf_output::{OverwriteResolver, Uniquifier};
use lf_rules::Subject;
use serde::{Deserialize, Serialize};

/// Sender for reporting progress from the executor.
///
/// Wraps a callback that receives the fraction of items done (0.0 -- 1.0)
/// and the name of the item just finished.
pub struct ProgressSender {
    callback: Box<dyn Fn(f32, &str) + Send + Sync>,
}

impl ProgressSender {
    pub fn new(callback: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// A sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    pub fn send(&self, progress: f32, step: &str) {
        (self.callback)(progress, step);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

/// Whether the executor produces real output or only computes it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Run,
    /// No exports, no overwrite resolution, image actions are only recorded.
    Preview,
}

/// Output settings for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    pub directory: PathBuf,
    /// Default extension for exports, without the dot.
    pub file_extension: String,
    pub traversal: TraversalMode,
    pub overwrite_mode: OverwriteMode,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            file_extension: "png".into(),
            traversal: TraversalMode::Hierarchical,
            overwrite_mode: OverwriteMode::RenameNew,
        }
    }
}

/// An image action recorded during a preview instead of being applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeferredAction {
    pub command_id: CommandId,
    pub procedure: String,
    pub args: ArgMap,
}

/// What the pipeline knows about one item while processing it.
#[derive(Debug, Clone)]
pub struct ItemState {
    pub item_id: ItemId,
    /// The host item actions are applied to.
    pub working_item: ItemId,
    pub original_name: String,
    /// Current processed name; renames change this, not the host item.
    pub name: String,
    pub kind: ItemKind,
    pub visible: bool,
    pub depth: usize,
    pub child_count: usize,
    pub selected: bool,
    /// Output folder segments below the output directory.
    pub folder: Vec<String>,
    pub output: Option<PathBuf>,
    pub applied: Vec<CommandId>,
    pub deferred: Vec<DeferredAction>,
}

impl ItemState {
    pub fn new(visit: &Visit<'_>, selected: bool) -> Self {
        let item = visit.item;
        Self {
            item_id: item.id,
            working_item: item.id,
            original_name: item.name.clone(),
            name: item.name.clone(),
            kind: item.kind,
            visible: item.visible,
            depth: item.depth,
            child_count: item.children.len(),
            selected,
            folder: visit.folder.clone(),
            output: None,
            applied: Vec::new(),
            deferred: Vec::new(),
        }
    }

    pub fn subject(&self) -> Subject<'_> {
        Subject {
            name: &self.name,
            kind: self.kind,
            visible: self.visible,
            depth: self.depth,
            child_count: self.child_count,
            selected: self.selected,
        }
    }
}

/// Everything an action may touch while it runs for one item.
pub struct ActionContext<'a> {
    pub host: &'a dyn Host,
    pub tree: &'a ItemTree,
    pub output: &'a OutputOptions,
    pub uniquifier: &'a mut Uniquifier,
    /// Present in run mode only.
    pub resolver: Option<&'a mut OverwriteResolver>,
    pub mode: ExecutionMode,
    pub command_id: CommandId,
    /// How many items this command has run for, including this one.
    pub sequence: u64,
}

impl ActionContext<'_> {
    pub fn is_preview(&self) -> bool {
        self.mode == ExecutionMode::Preview
    }

    /// Name of the item's direct parent, or an empty string.
    pub fn parent_name(&self, item: ItemId) -> String {
        parent_name(self.tree, item)
    }
}

pub(crate) fn parent_name(tree: &ItemTree, item: ItemId) -> String {
    tree.get(item)
        .and_then(|i| i.parent)
        .and_then(|p| tree.get(p))
        .map(|p| p.name.clone())
        .unwrap_or_default()
}
