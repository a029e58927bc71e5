//! Flatten a nested command list into execution order.

use lf_core::Result;

use crate::command::{Applicability, Command, CommandKind, FailurePolicy};
use crate::context::ExecutionMode;
use crate::registry::{ActionEffect, CommandRegistry};

/// A command with its inherited flags resolved.
#[derive(Debug, Clone)]
pub struct PlannedCommand {
    /// The command itself, without its nested commands.
    pub command: Command,
    pub effect: Option<ActionEffect>,
    /// False if the command or any enclosing command is disabled.
    pub enabled: bool,
    pub scope: Applicability,
    pub policy: FailurePolicy,
}

impl PlannedCommand {
    pub fn is_condition(&self) -> bool {
        self.command.kind == CommandKind::Condition
    }

    pub fn runs_in(&self, mode: ExecutionMode) -> bool {
        self.enabled
            && (mode == ExecutionMode::Run || self.command.more_options.enabled_for_previews)
    }
}

/// Validate `commands` and flatten them depth-first, each nested command
/// right after its parent.
pub fn plan(commands: &[Command], registry: &CommandRegistry) -> Result<Vec<PlannedCommand>> {
    registry.validate(commands)?;
    let mut out = Vec::new();
    flatten(commands, registry, true, Applicability::All, &mut out);
    Ok(out)
}

fn flatten(
    commands: &[Command],
    registry: &CommandRegistry,
    parent_enabled: bool,
    parent_scope: Applicability,
    out: &mut Vec<PlannedCommand>,
) {
    for command in commands {
        let enabled = parent_enabled && command.enabled;
        let scope = command.scope.unwrap_or(parent_scope);
        let descriptor = registry.get(&command.name);
        let policy = command
            .failure_policy
            .or_else(|| descriptor.map(|d| d.default_policy))
            .unwrap_or_default();

        let mut flat = command.clone();
        flat.children.clear();
        out.push(PlannedCommand {
            command: flat,
            effect: descriptor.and_then(|d| d.effect),
            enabled,
            scope,
            policy,
        });

        flatten(&command.children, registry, enabled, scope, out);
    }
}
