//! The persisted command model.
//!
//! A [`Command`] is either an action (it changes the item's name, pixels or
//! output) or a condition (it decides whether the item continues through the
//! pipeline). Commands may nest; nested commands run right after their parent.

use lf_core::CommandId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a command acts on an item or filters it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Action,
    Condition,
}

/// Which items a command applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    #[default]
    All,
    SelectedOnly,
}

/// What happens to the run when an action fails for one item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Record the failure and move on to the next item.
    #[default]
    Recoverable,
    /// Stop the whole run.
    Fatal,
}

/// Values filled in from the current item when the command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placeholder {
    CurrentItemName,
    CurrentItemId,
    ParentName,
    FolderPath,
    ItemKind,
    OutputDirectory,
    FileExtension,
}

/// A command argument: a stored constant or a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Constant(Value),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: ArgValue,
}

/// Per-command switches that do not affect what the command does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoreOptions {
    /// Run this command while building previews.
    pub enabled_for_previews: bool,
    /// For conditions: every enclosing group must match too.
    pub also_apply_to_parent_folders: bool,
}

impl Default for MoreOptions {
    fn default() -> Self {
        Self {
            enabled_for_previews: true,
            also_apply_to_parent_folders: false,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// One configured pipeline step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    #[serde(default)]
    pub id: CommandId,
    /// Registry key of the capability this command invokes.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub kind: CommandKind,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// `None` inherits the parent's applicability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<Applicability>,
    /// `None` uses the capability's default policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_policy: Option<FailurePolicy>,
    #[serde(default)]
    pub more_options: MoreOptions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Command>,
}

impl Command {
    fn new(name: impl Into<String>, kind: CommandKind) -> Self {
        let name = name.into();
        Self {
            id: CommandId::new(),
            display_name: name.clone(),
            name,
            kind,
            arguments: Vec::new(),
            enabled: true,
            scope: None,
            failure_policy: None,
            more_options: MoreOptions::default(),
            children: Vec::new(),
        }
    }

    pub fn action(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Action)
    }

    pub fn condition(name: impl Into<String>) -> Self {
        Self::new(name, CommandKind::Condition)
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    /// Builder: add or replace a constant argument.
    pub fn with_arg(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set_argument(name, ArgValue::Constant(value.into()));
        self
    }

    /// Builder: add or replace a placeholder argument.
    pub fn with_placeholder(mut self, name: &str, placeholder: Placeholder) -> Self {
        self.set_argument(name, ArgValue::Placeholder(placeholder));
        self
    }

    pub fn with_scope(mut self, scope: Applicability) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn with_child(mut self, child: Command) -> Self {
        self.children.push(child);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn for_previews(mut self, enabled: bool) -> Self {
        self.more_options.enabled_for_previews = enabled;
        self
    }

    pub fn apply_to_parents(mut self, enabled: bool) -> Self {
        self.more_options.also_apply_to_parent_folders = enabled;
        self
    }

    pub fn set_argument(&mut self, name: &str, value: ArgValue) {
        match self.arguments.iter_mut().find(|arg| arg.name == name) {
            Some(arg) => arg.value = value,
            None => self.arguments.push(Argument {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn argument(&self, name: &str) -> Option<&ArgValue> {
        self.arguments
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| &arg.value)
    }

    /// Name shown to users: the display name, or the registry key.
    pub fn label(&self) -> &str {
        if self.display_name.is_empty() {
            &self.name
        } else {
            &self.display_name
        }
    }

    /// This command and all nested commands, depth-first.
    pub fn walk(&self) -> Vec<&Command> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(cmd) = stack.pop() {
            out.push(cmd);
            stack.extend(cmd.children.iter().rev());
        }
        out
    }
}

/// Find a command by id anywhere in a (nested) command list.
pub fn find_command(commands: &[Command], id: CommandId) -> Option<&Command> {
    commands
        .iter()
        .flat_map(Command::walk)
        .find(|cmd| cmd.id == id)
}
