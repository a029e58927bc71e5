//! The plugin's settings tree with its defaults.

use lf_core::config::Config;
use lf_core::{OverwriteMode, TraversalMode};
use lf_pipeline::Command;
use serde_json::json;

use crate::setting::{Constraint, Setting};
use crate::tree::SettingsTree;
use crate::value::SettingValue;

pub const OUTPUT_DIRECTORY: &str = "main/output_directory";
pub const FILE_EXTENSION: &str = "main/file_extension";
pub const OVERWRITE_MODE: &str = "main/overwrite_mode";
pub const NON_INTERACTIVE_OVERWRITE: &str = "main/non_interactive_overwrite";
pub const TRAVERSAL: &str = "main/traversal";
pub const MAX_DEPTH: &str = "main/max_depth";
pub const COMMANDS: &str = "main/commands";
pub const SELECTED_ITEMS: &str = "main/selected_items";
pub const PREVIEW_MAX_ITEMS: &str = "gui/preview_max_items";
pub const THUMBNAIL_SIZE: &str = "gui/thumbnail_size";
pub const SHOW_ORIGINAL_NAMES: &str = "gui/show_original_names";

const DEFAULT_MAX_DEPTH: i64 = 64;

/// Export every layer; the out-of-the-box pipeline.
pub fn default_commands() -> Vec<Command> {
    vec![
        Command::condition("kind")
            .with_display_name("Only layers")
            .with_arg("kinds", json!(["layer"])),
        Command::action("export").with_display_name("Export"),
    ]
}

/// Settings tree seeded from the application config.
pub fn plugin_settings(config: &Config) -> SettingsTree {
    let overwrite_modes = OverwriteMode::ALL.iter().map(|m| m.as_str());
    let fallback_modes = OverwriteMode::ALL
        .iter()
        .filter(|m| **m != OverwriteMode::Ask)
        .map(|m| m.as_str());
    let max_depth = config
        .batch
        .max_depth
        .and_then(|d| i64::try_from(d).ok())
        .unwrap_or(DEFAULT_MAX_DEPTH);
    let fallback = match config.batch.non_interactive_overwrite {
        OverwriteMode::Ask => OverwriteMode::RenameNew,
        mode => mode,
    };

    SettingsTree::new()
        .with_group(
            "main",
            vec![
                Setting::new("output_directory", SettingValue::Path(".".into()))
                    .with_constraint(Constraint::NonEmpty),
                Setting::new("file_extension", SettingValue::String("png".into()))
                    .with_constraint(Constraint::FileExtension),
                Setting::new(
                    "overwrite_mode",
                    SettingValue::Choice(OverwriteMode::RenameNew.as_str().into()),
                )
                .with_constraint(Constraint::one_of(overwrite_modes)),
                Setting::new(
                    "non_interactive_overwrite",
                    SettingValue::Choice(fallback.as_str().into()),
                )
                .with_constraint(Constraint::one_of(fallback_modes)),
                Setting::new(
                    "traversal",
                    SettingValue::Choice(TraversalMode::Hierarchical.to_string()),
                )
                .with_constraint(Constraint::one_of(["flat", "hierarchical"])),
                Setting::new("max_depth", SettingValue::Int(max_depth))
                    .with_constraint(Constraint::IntRange { min: 0, max: 1024 }),
                Setting::new("commands", SettingValue::Commands(default_commands())),
                Setting::new("selected_items", SettingValue::IdList(Vec::new())).session(),
            ],
        )
        .with_group(
            "gui",
            vec![
                Setting::new(
                    "preview_max_items",
                    SettingValue::Int(config.preview.max_items as i64),
                )
                .with_constraint(Constraint::IntRange { min: 0, max: 10_000 }),
                Setting::new(
                    "thumbnail_size",
                    SettingValue::Int(i64::from(config.preview.thumbnail_size)),
                )
                .with_constraint(Constraint::IntRange { min: 0, max: 4096 }),
                Setting::new("show_original_names", SettingValue::Bool(false)),
            ],
        )
}
