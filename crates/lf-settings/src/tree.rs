//! Ordered groups of settings addressed by `group/name` paths.

use std::collections::BTreeMap;

use lf_core::{Error, Result};
use serde_json::Value;

use crate::setting::Setting;
use crate::value::SettingValue;

#[derive(Debug, Clone, PartialEq)]
pub struct SettingGroup {
    pub name: String,
    pub settings: Vec<Setting>,
}

/// Raw document entries with no matching setting, kept so a save does not
/// drop them.
pub type UnknownEntries = BTreeMap<String, BTreeMap<String, Value>>;

/// The settings tree. Every change bumps the revision counter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsTree {
    groups: Vec<SettingGroup>,
    revision: u64,
    unknown: UnknownEntries,
}

/// Split `group/name`.
pub fn split_path(path: &str) -> Result<(&str, &str)> {
    path.split_once('/')
        .filter(|(group, name)| !group.is_empty() && !name.is_empty() && !name.contains('/'))
        .ok_or_else(|| Error::Validation(format!("setting path must be group/name, got {path:?}")))
}

impl SettingsTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: append a group.
    pub fn with_group(mut self, name: &str, settings: Vec<Setting>) -> Self {
        self.groups.push(SettingGroup {
            name: name.to_string(),
            settings,
        });
        self
    }

    pub fn groups(&self) -> &[SettingGroup] {
        &self.groups
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get(&self, path: &str) -> Option<&Setting> {
        let (group, name) = split_path(path).ok()?;
        self.groups
            .iter()
            .find(|g| g.name == group)?
            .settings
            .iter()
            .find(|s| s.name() == name)
    }

    fn get_mut(&mut self, path: &str) -> Result<&mut Setting> {
        let (group, name) = split_path(path)?;
        self.groups
            .iter_mut()
            .find(|g| g.name == group)
            .and_then(|g| g.settings.iter_mut().find(|s| s.name() == name))
            .ok_or_else(|| Error::not_found("setting", path))
    }

    /// Current value at `path`.
    pub fn value(&self, path: &str) -> Result<&SettingValue> {
        self.get(path)
            .map(Setting::value)
            .ok_or_else(|| Error::not_found("setting", path))
    }

    /// Set a value; bumps the revision when it changed.
    pub fn set(&mut self, path: &str, value: SettingValue) -> Result<bool> {
        let changed = self.get_mut(path)?.set(value)?;
        if changed {
            self.revision += 1;
        }
        Ok(changed)
    }

    /// Reset one setting. Returns whether it changed.
    pub fn reset(&mut self, path: &str) -> Result<bool> {
        let changed = self.get_mut(path)?.reset();
        if changed {
            self.revision += 1;
        }
        Ok(changed)
    }

    /// Reset a whole group. Returns how many settings changed.
    pub fn reset_group(&mut self, group: &str) -> Result<usize> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| g.name == group)
            .ok_or_else(|| Error::not_found("setting group", group))?;
        let changed = group.settings.iter_mut().map(Setting::reset).filter(|c| *c).count();
        if changed > 0 {
            self.revision += 1;
        }
        Ok(changed)
    }

    /// Reset every setting. Returns how many changed.
    pub fn reset_all(&mut self) -> usize {
        let changed = self
            .groups
            .iter_mut()
            .flat_map(|g| g.settings.iter_mut())
            .map(Setting::reset)
            .filter(|c| *c)
            .count();
        if changed > 0 {
            self.revision += 1;
        }
        changed
    }

    /// All settings with their `group/name` paths, in tree order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &Setting)> {
        self.groups.iter().flat_map(|g| {
            g.settings
                .iter()
                .map(move |s| (format!("{}/{}", g.name, s.name()), s))
        })
    }

    pub fn unknown(&self) -> &UnknownEntries {
        &self.unknown
    }

    pub fn set_unknown(&mut self, group: &str, name: &str, raw: Value) {
        self.unknown
            .entry(group.to_string())
            .or_default()
            .insert(name.to_string(), raw);
    }

    pub fn clear_unknown(&mut self) {
        self.unknown.clear();
    }
}
