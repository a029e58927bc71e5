//! Domain enums and item metadata shared by every layerforge crate.
//!
//! All enums serialize in snake_case and implement `Display`/`FromStr` with
//! the same spelling, so CLI flags, settings documents and logs agree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Resolved command arguments and export format arguments.
pub type ArgMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// ItemKind
// ---------------------------------------------------------------------------

/// What kind of node an item is in the host's tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Image,
    Layer,
    Group,
}

impl ItemKind {
    /// Images and groups may have children; layers are leaves.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Image | Self::Group)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Layer => write!(f, "layer"),
            Self::Group => write!(f, "group"),
        }
    }
}

impl FromStr for ItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "layer" => Ok(Self::Layer),
            "group" => Ok(Self::Group),
            other => Err(Error::Validation(format!("unknown item kind: {other}"))),
        }
    }
}

/// Metadata the host reports for a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    pub name: String,
    pub kind: ItemKind,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl ItemMetadata {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visible: true,
        }
    }
}

// ---------------------------------------------------------------------------
// RunMode
// ---------------------------------------------------------------------------

/// How a batch run was started. Governs settings persistence and whether the
/// user may be asked questions mid-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Interactive,
    NonInteractive,
    RunWithLastValues,
}

impl RunMode {
    /// Whether persisted settings are read before the run.
    pub fn loads_settings(&self) -> bool {
        matches!(self, Self::Interactive | Self::RunWithLastValues)
    }

    /// Whether settings are written back after the run.
    pub fn saves_settings(&self) -> bool {
        matches!(self, Self::Interactive)
    }

    /// Whether overwrite conflicts may be deferred to the user.
    pub fn allows_ask(&self) -> bool {
        matches!(self, Self::Interactive)
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Interactive => write!(f, "interactive"),
            Self::NonInteractive => write!(f, "non_interactive"),
            Self::RunWithLastValues => write!(f, "run_with_last_values"),
        }
    }
}

impl FromStr for RunMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "interactive" => Ok(Self::Interactive),
            "non_interactive" | "non-interactive" => Ok(Self::NonInteractive),
            "run_with_last_values" | "last-values" => Ok(Self::RunWithLastValues),
            other => Err(Error::Validation(format!("unknown run mode: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// OverwriteMode
// ---------------------------------------------------------------------------

/// Policy applied when an output path already exists on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverwriteMode {
    Ask,
    Replace,
    Skip,
    RenameNew,
    RenameExisting,
    Cancel,
}

impl OverwriteMode {
    /// Every mode, in presentation order.
    pub const ALL: [OverwriteMode; 6] = [
        Self::Ask,
        Self::Replace,
        Self::Skip,
        Self::RenameNew,
        Self::RenameExisting,
        Self::Cancel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::Replace => "replace",
            Self::Skip => "skip",
            Self::RenameNew => "rename_new",
            Self::RenameExisting => "rename_existing",
            Self::Cancel => "cancel",
        }
    }
}

impl fmt::Display for OverwriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverwriteMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s || mode.as_str().replace('_', "-") == s)
            .ok_or_else(|| Error::Validation(format!("unknown overwrite mode: {s}")))
    }
}

// ---------------------------------------------------------------------------
// TraversalMode
// ---------------------------------------------------------------------------

/// How the item tree maps onto output folders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalMode {
    /// Every item lands directly in the output directory.
    Flat,
    /// Group names become sub-folders.
    #[default]
    Hierarchical,
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Hierarchical => write!(f, "hierarchical"),
        }
    }
}

impl FromStr for TraversalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "hierarchical" => Ok(Self::Hierarchical),
            other => Err(Error::Validation(format!("unknown traversal mode: {other}"))),
        }
    }
}
