//! What the preview shows.

use std::collections::BTreeSet;
use std::path::PathBuf;

use lf_core::ItemId;
use lf_items::Thumbnail;
use lf_pipeline::{Command, ItemOutcome, ItemStatus, OutputOptions};
use lf_settings::ResolvedSettings;

/// One previewed item.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewEntry {
    pub item_id: ItemId,
    pub original_name: String,
    /// False when a condition rejected the item.
    pub included: bool,
    /// File name the item would be exported under, or its processed name
    /// when no export ran.
    pub resolved_name: String,
    pub output: Option<PathBuf>,
    pub thumbnail: Option<Thumbnail>,
    /// Why the item would be skipped or fail.
    pub error: Option<String>,
}

impl PreviewEntry {
    pub(crate) fn from_outcome(outcome: &ItemOutcome, thumbnail: Option<Thumbnail>) -> Self {
        let resolved_name = outcome
            .output
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| outcome.name.clone());
        let error = match &outcome.status {
            ItemStatus::Skipped { reason } => Some(reason.clone()),
            ItemStatus::Failed { command, error } => Some(format!("{command}: {error}")),
            ItemStatus::Processed | ItemStatus::Excluded { .. } => None,
        };
        Self {
            item_id: outcome.item_id,
            original_name: outcome.original_name.clone(),
            included: outcome.is_included(),
            resolved_name,
            output: outcome.output.clone(),
            thumbnail,
            error,
        }
    }
}

/// The last completed preview.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewState {
    /// Incremented by every completed render; 0 before the first one.
    pub revision: u64,
    pub entries: Vec<PreviewEntry>,
    /// More items exist than the preview shows.
    pub truncated: bool,
}

impl PreviewState {
    pub fn entry(&self, item: ItemId) -> Option<&PreviewEntry> {
        self.entries.iter().find(|e| e.item_id == item)
    }

    pub fn included(&self) -> impl Iterator<Item = &PreviewEntry> {
        self.entries.iter().filter(|e| e.included)
    }
}

/// Limits of a preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub max_items: usize,
    /// 0 disables thumbnails.
    pub thumbnail_size: u32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            max_items: 50,
            thumbnail_size: 96,
        }
    }
}

impl From<&ResolvedSettings> for PreviewOptions {
    fn from(settings: &ResolvedSettings) -> Self {
        Self {
            max_items: settings.preview_max_items,
            thumbnail_size: settings.thumbnail_size,
        }
    }
}

/// The settings a preview simulates.
#[derive(Debug, Clone, Default)]
pub struct PreviewInput {
    pub commands: Vec<Command>,
    pub output: OutputOptions,
    pub selected: BTreeSet<ItemId>,
}

impl From<&ResolvedSettings> for PreviewInput {
    fn from(settings: &ResolvedSettings) -> Self {
        Self {
            commands: settings.commands.clone(),
            output: settings.output.clone(),
            selected: settings.selected.clone(),
        }
    }
}
