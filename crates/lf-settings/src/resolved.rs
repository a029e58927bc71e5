//! Effective values for one run, after overrides.

use std::collections::{BTreeMap, BTreeSet};

use lf_core::{Error, ItemId, OverwriteMode, Result, RunMode, TraversalMode};
use lf_pipeline::{Command, OutputOptions};

use crate::defaults;
use crate::tree::SettingsTree;
use crate::value::SettingValue;

/// Explicit values that take precedence over loaded and default ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    values: BTreeMap<String, SettingValue>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, value: SettingValue) -> Self {
        self.set(path, value);
        self
    }

    pub fn set(&mut self, path: &str, value: SettingValue) {
        self.values.insert(path.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SettingValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Apply every override to `tree`. Any invalid value is a validation error.
    pub fn apply_to(&self, tree: &mut SettingsTree) -> Result<()> {
        for (path, value) in self.iter() {
            tree.set(path, value.clone()).map_err(|e| match e {
                Error::Validation(msg) => Error::Validation(format!("override {path}: {msg}")),
                Error::NotFound { .. } => Error::Validation(format!("override {path}: no such setting")),
                other => other,
            })?;
        }
        Ok(())
    }
}

/// Typed snapshot of the settings a run uses.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Revision of the tree the snapshot was taken from.
    pub revision: u64,
    pub output: OutputOptions,
    pub non_interactive_overwrite: OverwriteMode,
    pub max_depth: Option<usize>,
    pub commands: Vec<Command>,
    pub selected: BTreeSet<ItemId>,
    pub preview_max_items: usize,
    pub thumbnail_size: u32,
    pub show_original_names: bool,
}

impl ResolvedSettings {
    pub(crate) fn from_tree(tree: &SettingsTree) -> Result<Self> {
        let output = OutputOptions {
            directory: value(tree, defaults::OUTPUT_DIRECTORY, SettingValue::as_path)?.to_path_buf(),
            file_extension: value(tree, defaults::FILE_EXTENSION, SettingValue::as_str)?.to_string(),
            traversal: value(tree, defaults::TRAVERSAL, SettingValue::as_str)?.parse::<TraversalMode>()?,
            overwrite_mode: value(tree, defaults::OVERWRITE_MODE, SettingValue::as_str)?.parse::<OverwriteMode>()?,
        };

        Ok(Self {
            revision: tree.revision(),
            output,
            non_interactive_overwrite: value(tree, defaults::NON_INTERACTIVE_OVERWRITE, SettingValue::as_str)?
                .parse()?,
            max_depth: Some(to_usize(value(tree, defaults::MAX_DEPTH, SettingValue::as_int)?)),
            commands: value(tree, defaults::COMMANDS, SettingValue::as_commands)?.to_vec(),
            selected: value(tree, defaults::SELECTED_ITEMS, SettingValue::as_id_list)?
                .iter()
                .map(|id| ItemId::new(*id))
                .collect(),
            preview_max_items: to_usize(value(tree, defaults::PREVIEW_MAX_ITEMS, SettingValue::as_int)?),
            thumbnail_size: u32::try_from(value(tree, defaults::THUMBNAIL_SIZE, SettingValue::as_int)?)
                .unwrap_or(0),
            show_original_names: value(tree, defaults::SHOW_ORIGINAL_NAMES, SettingValue::as_bool)?,
        })
    }

    /// Overwrite mode a run in `run_mode` should use.
    ///
    /// A replayed interactive configuration cannot ask, so `ask` becomes
    /// the non-interactive fallback. An explicit `ask` in a non-interactive
    /// run is left alone and rejected when the run starts.
    pub fn effective_overwrite(&self, run_mode: RunMode) -> OverwriteMode {
        match (run_mode, self.output.overwrite_mode) {
            (RunMode::RunWithLastValues, OverwriteMode::Ask) => self.non_interactive_overwrite,
            (_, mode) => mode,
        }
    }

    /// Output options with the effective overwrite mode for `run_mode`.
    pub fn output_for(&self, run_mode: RunMode) -> OutputOptions {
        OutputOptions {
            overwrite_mode: self.effective_overwrite(run_mode),
            ..self.output.clone()
        }
    }
}

fn value<'t, T>(
    tree: &'t SettingsTree,
    path: &str,
    get: impl Fn(&'t SettingValue) -> Option<T>,
) -> Result<T> {
    let raw = tree.value(path)?;
    get(raw).ok_or_else(|| Error::Internal(format!("{path} holds a {} value", raw.value_type())))
}

fn to_usize(n: i64) -> usize {
    usize::try_from(n).unwrap_or(0)
}
