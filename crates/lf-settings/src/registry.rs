//! The settings registry: load, save, reset, import/export and resolution.

use std::collections::BTreeMap;
use std::path::Path;

use lf_core::config::Config;
use lf_core::{Error, Result};
use lf_pipeline::Command;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defaults;
use crate::persist::{self, SettingsDocument, FORMAT_VERSION};
use crate::resolved::{Overrides, ResolvedSettings};
use crate::tree::{split_path, SettingsTree};
use crate::value::SettingValue;

/// What happened during [`SettingsRegistry::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub source_found: bool,
    /// Settings taken from the document.
    pub loaded: usize,
    /// Problems that made a setting (or the whole document) fall back to
    /// its default.
    pub warnings: Vec<String>,
    /// `group/name` entries without a matching setting; kept for saving.
    pub unknown_keys: Vec<String>,
}

/// File format of an exported command list.
#[derive(Debug, Serialize, Deserialize)]
struct CommandsFile {
    format_version: u32,
    commands: Vec<Command>,
}

/// Owns the settings tree and moves it to and from disk.
#[derive(Debug, Clone)]
pub struct SettingsRegistry {
    tree: SettingsTree,
}

impl SettingsRegistry {
    pub fn new(tree: SettingsTree) -> Self {
        Self { tree }
    }

    /// Registry holding the plugin defaults.
    pub fn with_defaults(config: &Config) -> Self {
        Self::new(defaults::plugin_settings(config))
    }

    pub fn tree(&self) -> &SettingsTree {
        &self.tree
    }

    pub fn revision(&self) -> u64 {
        self.tree.revision()
    }

    pub fn value(&self, path: &str) -> Result<&SettingValue> {
        self.tree.value(path)
    }

    /// Set one value. Returns whether it changed.
    pub fn set(&mut self, path: &str, value: SettingValue) -> Result<bool> {
        self.tree.set(path, value)
    }

    /// Write overrides into the tree, as in-session edits.
    pub fn apply_overrides(&mut self, overrides: &Overrides) -> Result<()> {
        overrides.apply_to(&mut self.tree)
    }

    /// Replace the tree's persistent values with those in `source`.
    ///
    /// Reads under the same per-path lock as [`save`](Self::save). Never fails: a missing file leaves the defaults, an unreadable or
    /// corrupt one is reported as a warning, and each invalid entry falls
    /// back to its default on its own.
    pub fn load(&mut self, source: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        self.tree.reset_all();
        self.tree.clear_unknown();

        let read = {
            let lock = persist::path_lock(source);
            let _guard = lock.lock();
            persist::read_document(source)
        };
        let doc = match read {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::info!("No settings at {}; using defaults", source.display());
                return report;
            }
            Err(e) => {
                tracing::warn!("Ignoring settings at {}: {e}", source.display());
                report.source_found = true;
                report.warnings.push(e.to_string());
                return report;
            }
        };
        report.source_found = true;

        for (group, entries) in doc.settings {
            for (name, raw) in entries {
                let path = format!("{group}/{name}");
                let Some(setting) = self.tree.get(&path) else {
                    tracing::debug!("Keeping unknown setting {path}");
                    report.unknown_keys.push(path);
                    self.tree.set_unknown(&group, &name, raw);
                    continue;
                };
                if !setting.is_persistent() {
                    tracing::debug!("Ignoring stored session setting {path}");
                    continue;
                }

                let applied = serde_json::from_value::<SettingValue>(raw)
                    .map_err(|e| Error::Validation(format!("{path}: {e}")))
                    .and_then(|value| self.tree.set(&path, value));
                match applied {
                    Ok(_) => report.loaded += 1,
                    Err(e) => {
                        tracing::warn!("Using default for {path}: {e}");
                        report.warnings.push(e.to_string());
                    }
                }
            }
        }

        tracing::info!(
            "Loaded {} setting(s) from {} ({} warning(s))",
            report.loaded,
            source.display(),
            report.warnings.len()
        );
        report
    }

    /// Write the persistent settings to `destination`.
    ///
    /// Holds the destination's lock for the whole read-modify-write so
    /// unknown entries written by someone else in the meantime survive.
    pub fn save(&self, destination: &Path) -> Result<()> {
        let lock = persist::path_lock(destination);
        let _guard = lock.lock();

        let mut settings: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        match persist::read_document(destination) {
            Ok(Some(existing)) => {
                for (group, entries) in existing.settings {
                    for (name, raw) in entries {
                        if self.tree.get(&format!("{group}/{name}")).is_none() {
                            settings.entry(group.clone()).or_default().insert(name, raw);
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Overwriting unreadable settings at {}: {e}", destination.display()),
        }

        for (group, entries) in self.tree.unknown() {
            for (name, raw) in entries {
                settings
                    .entry(group.clone())
                    .or_default()
                    .entry(name.clone())
                    .or_insert_with(|| raw.clone());
            }
        }

        for (path, setting) in self.tree.iter().filter(|(_, s)| s.is_persistent()) {
            let (group, name) = split_path(&path)?;
            let raw = serde_json::to_value(setting.value())
                .map_err(|e| Error::Persistence(format!("failed to serialize {path}: {e}")))?;
            settings
                .entry(group.to_string())
                .or_default()
                .insert(name.to_string(), raw);
        }

        persist::write_json(destination, &SettingsDocument::new(settings))?;
        tracing::info!("Saved settings to {}", destination.display());
        Ok(())
    }

    /// Reset settings to their defaults.
    ///
    /// Each entry is a `group/name` path or a bare group name; an empty
    /// subset resets everything. Returns how many settings changed.
    pub fn reset(&mut self, subset: &[&str]) -> Result<usize> {
        if subset.is_empty() {
            return Ok(self.tree.reset_all());
        }
        let mut changed = 0;
        for entry in subset {
            if entry.contains('/') {
                changed += usize::from(self.tree.reset(entry)?);
            } else {
                changed += self.tree.reset_group(entry)?;
            }
        }
        Ok(changed)
    }

    pub fn commands(&self) -> Result<&[Command]> {
        self.tree
            .value(defaults::COMMANDS)?
            .as_commands()
            .ok_or_else(|| Error::Internal("main/commands does not hold commands".into()))
    }

    /// Write the command list to a standalone file.
    pub fn export_commands(&self, destination: &Path) -> Result<()> {
        let file = CommandsFile {
            format_version: FORMAT_VERSION,
            commands: self.commands()?.to_vec(),
        };
        let lock = persist::path_lock(destination);
        let _guard = lock.lock();
        persist::write_json(destination, &file)
    }

    /// Replace the command list with the one in `source`.
    /// Returns the number of top-level commands imported.
    pub fn import_commands(&mut self, source: &Path) -> Result<usize> {
        let contents = {
            let lock = persist::path_lock(source);
            let _guard = lock.lock();
            persist::read_optional(source)?
        }
        .ok_or_else(|| Error::not_found("commands file", source.display()))?;
        let file: CommandsFile = serde_json::from_str(&contents)
            .map_err(|e| Error::Persistence(format!("{} is not a commands file: {e}", source.display())))?;
        if file.format_version > FORMAT_VERSION {
            return Err(Error::Persistence(format!(
                "{} uses format version {}, newer than {FORMAT_VERSION}",
                source.display(),
                file.format_version
            )));
        }

        let count = file.commands.len();
        self.tree
            .set(defaults::COMMANDS, SettingValue::Commands(file.commands))?;
        tracing::info!("Imported {count} command(s) from {}", source.display());
        Ok(count)
    }

    /// Effective values: override, then loaded, then default.
    pub fn resolve(&self, overrides: &Overrides) -> Result<ResolvedSettings> {
        if overrides.is_empty() {
            return ResolvedSettings::from_tree(&self.tree);
        }
        let mut tree = self.tree.clone();
        overrides.apply_to(&mut tree)?;
        ResolvedSettings::from_tree(&tree)
    }
}
