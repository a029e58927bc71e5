//! # lf-settings
//!
//! Typed, persisted settings for layerforge.
//!
//! - [`SettingsTree`] -- ordered groups of [`Setting`]s with a revision
//!   counter.
//! - [`SettingsRegistry`] -- load/save with atomic writes, reset, command
//!   import/export and resolution into [`ResolvedSettings`].
//! - [`defaults`] -- the plugin's settings and their default values.

pub mod defaults;
pub mod persist;
pub mod registry;
pub mod resolved;
pub mod setting;
pub mod tree;
pub mod value;

pub use registry::{LoadReport, SettingsRegistry};
pub use resolved::{Overrides, ResolvedSettings};
pub use setting::{Constraint, Persistence, Setting};
pub use tree::{SettingGroup, SettingsTree};
pub use value::{SettingValue, ValueType};
