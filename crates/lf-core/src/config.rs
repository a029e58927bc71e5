//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON. Every section
//! defaults sensibly so a completely empty `{}` file is valid. The typed
//! plugin settings (output directory, commands, ...) live in the persisted
//! settings document instead; this file only configures the tool itself.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::model::OverwriteMode;
use crate::Error;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub batch: BatchConfig,
    pub preview: PreviewConfig,
    pub settings: SettingsConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None`, missing or unparsable.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.batch.non_interactive_overwrite == OverwriteMode::Ask {
            warnings.push(
                "batch.non_interactive_overwrite is ask; non-interactive runs will refuse to start"
                    .into(),
            );
        }
        if self.batch.max_depth == Some(0) {
            warnings.push("batch.max_depth is 0; only top-level items will be visited".into());
        }
        if self.preview.max_items == 0 {
            warnings.push("preview.max_items is 0; previews will be empty".into());
        }
        if self.preview.thumbnail_size == 0 {
            warnings.push("preview.thumbnail_size is 0; thumbnails are disabled".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Batch run behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Mode substituted for `ask` when a saved interactive configuration is
    /// replayed without a user present.
    pub non_interactive_overwrite: OverwriteMode,
    /// Maximum traversal depth below the top level; `None` is unbounded.
    pub max_depth: Option<usize>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            non_interactive_overwrite: OverwriteMode::RenameNew,
            max_depth: None,
        }
    }
}

/// Preview rendering limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub max_items: usize,
    pub thumbnail_size: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_items: 50,
            thumbnail_size: 128,
        }
    }
}

/// Location of the persisted settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_valid() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(
            config.batch.non_interactive_overwrite,
            OverwriteMode::RenameNew
        );
        assert_eq!(config.preview.max_items, 50);
        assert!(config.settings.path.is_none());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config =
            Config::from_json(r#"{"batch": {"non_interactive_overwrite": "skip"}}"#).unwrap();
        assert_eq!(config.batch.non_interactive_overwrite, OverwriteMode::Skip);
        assert_eq!(config.preview.thumbnail_size, 128);
    }

    #[test]
    fn invalid_json_is_validation_error() {
        let err = Config::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(Some(&dir.path().join("absent.json")));
        assert_eq!(config.preview.max_items, 50);
    }

    #[test]
    fn load_or_default_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layerforge.json");
        std::fs::write(&path, r#"{"preview": {"max_items": 5}}"#).unwrap();
        let config = Config::load_or_default(Some(&path));
        assert_eq!(config.preview.max_items, 5);
    }

    #[test]
    fn validate_flags_ask_fallback() {
        let mut config = Config::default();
        config.batch.non_interactive_overwrite = OverwriteMode::Ask;
        config.preview.max_items = 0;
        let warnings = config.validate();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("non_interactive_overwrite"));
    }
}
