//! Which parts of the preview a change makes stale.

use std::ops::BitOr;

use lf_pipeline::{ActionEffect, CommandKind, CommandRegistry};
use lf_settings::defaults;

/// Dirty flags for the two preview passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Inclusion flags and resolved names.
    pub names: bool,
    /// Thumbnails of image actions.
    pub thumbnails: bool,
}

impl Invalidation {
    pub const NONE: Self = Self {
        names: false,
        thumbnails: false,
    };
    pub const NAMES: Self = Self {
        names: true,
        thumbnails: false,
    };
    pub const THUMBNAILS: Self = Self {
        names: false,
        thumbnails: true,
    };
    pub const ALL: Self = Self {
        names: true,
        thumbnails: true,
    };

    pub fn is_clean(&self) -> bool {
        !self.names && !self.thumbnails
    }
}

impl BitOr for Invalidation {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            names: self.names || rhs.names,
            thumbnails: self.thumbnails || rhs.thumbnails,
        }
    }
}

/// The part of a command that was edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandField {
    DisplayName,
    Arguments,
    Enabled,
    /// Scope, failure policy or the "more options" flags.
    Options,
    /// The command was added, removed or moved.
    Structure,
}

/// Something the preview may depend on changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingChange {
    /// A setting, by `group/name` path.
    Setting(String),
    /// A command with the given registry name was edited.
    Command { name: String, field: CommandField },
    CommandsReordered,
    /// The host's item tree changed.
    Items,
    Selection,
}

impl SettingChange {
    pub fn setting(path: &str) -> Self {
        Self::Setting(path.to_string())
    }

    pub fn command(name: &str, field: CommandField) -> Self {
        Self::Command {
            name: name.to_string(),
            field,
        }
    }

    /// The passes this change makes stale.
    pub fn scope(&self, registry: &CommandRegistry) -> Invalidation {
        match self {
            Self::Setting(path) => setting_scope(path),
            Self::Command {
                field: CommandField::DisplayName,
                ..
            } => Invalidation::NONE,
            Self::Command { name, .. } => match registry.get(name) {
                Some(d) if d.kind == CommandKind::Condition => Invalidation::ALL,
                Some(d) => match d.effect {
                    Some(ActionEffect::Image) => Invalidation::THUMBNAILS,
                    Some(ActionEffect::Name | ActionEffect::Export) => Invalidation::NAMES,
                    None => Invalidation::ALL,
                },
                None => Invalidation::ALL,
            },
            Self::CommandsReordered | Self::Items | Self::Selection => Invalidation::ALL,
        }
    }
}

fn setting_scope(path: &str) -> Invalidation {
    match path {
        defaults::OUTPUT_DIRECTORY | defaults::FILE_EXTENSION | defaults::TRAVERSAL => Invalidation::NAMES,
        defaults::OVERWRITE_MODE | defaults::NON_INTERACTIVE_OVERWRITE | defaults::SHOW_ORIGINAL_NAMES => {
            Invalidation::NONE
        }
        // Everything else changes which items are shown or how.
        _ => Invalidation::ALL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_pipeline::ArgSpec;

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::builtin();
        registry.register_host_procedure("blur", Vec::<ArgSpec>::new()).unwrap();
        registry
    }

    #[test]
    fn settings_map_to_passes() {
        let r = registry();
        assert_eq!(SettingChange::setting(defaults::FILE_EXTENSION).scope(&r), Invalidation::NAMES);
        assert_eq!(SettingChange::setting(defaults::OVERWRITE_MODE).scope(&r), Invalidation::NONE);
        assert_eq!(SettingChange::setting(defaults::SHOW_ORIGINAL_NAMES).scope(&r), Invalidation::NONE);
        assert_eq!(SettingChange::setting(defaults::THUMBNAIL_SIZE).scope(&r), Invalidation::ALL);
        assert_eq!(SettingChange::setting(defaults::COMMANDS).scope(&r), Invalidation::ALL);
    }

    #[test]
    fn command_edits_follow_their_effect() {
        let r = registry();
        assert_eq!(
            SettingChange::command("rename", CommandField::Arguments).scope(&r),
            Invalidation::NAMES
        );
        assert_eq!(
            SettingChange::command("blur", CommandField::Arguments).scope(&r),
            Invalidation::THUMBNAILS
        );
        assert_eq!(
            SettingChange::command("kind", CommandField::Enabled).scope(&r),
            Invalidation::ALL
        );
        assert_eq!(
            SettingChange::command("kind", CommandField::DisplayName).scope(&r),
            Invalidation::NONE
        );
        assert_eq!(
            SettingChange::command("unknown", CommandField::Arguments).scope(&r),
            Invalidation::ALL
        );
    }

    #[test]
    fn flags_combine() {
        assert_eq!(Invalidation::NAMES | Invalidation::THUMBNAILS, Invalidation::ALL);
        assert!((Invalidation::NONE | Invalidation::NONE).is_clean());
    }
}
