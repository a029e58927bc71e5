//! Capability descriptors for every command name a pipeline may use.
//!
//! The registry is checked once before a run starts: unknown commands,
//! missing or mistyped arguments and unbuildable conditions are reported
//! up front instead of failing halfway through a batch.

use std::collections::BTreeMap;

use lf_core::{ArgMap, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::{ArgValue, Command, CommandKind, FailurePolicy, Placeholder};
use crate::conditions::compile_condition;

/// Type of a command argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgType {
    Bool,
    Int,
    Float,
    String,
    StringList,
    Json,
}

impl ArgType {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgType::Bool => value.is_boolean(),
            ArgType::Int => value.is_i64() || value.is_u64(),
            ArgType::Float => value.is_number(),
            ArgType::String => value.is_string(),
            ArgType::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            ArgType::Json => true,
        }
    }

    fn accepts_placeholder(&self, placeholder: Placeholder) -> bool {
        match placeholder {
            Placeholder::CurrentItemId => matches!(self, ArgType::Int | ArgType::Float | ArgType::Json),
            _ => matches!(self, ArgType::String | ArgType::Json),
        }
    }
}

/// Declared argument of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ArgType,
    #[serde(default)]
    pub required: bool,
}

impl ArgSpec {
    pub fn required(name: &str, ty: ArgType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: true,
        }
    }

    pub fn optional(name: &str, ty: ArgType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            required: false,
        }
    }
}

/// What an action touches. Drives preview invalidation and thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionEffect {
    /// Changes the output name or folder only.
    Name,
    /// Changes pixel data through a host procedure.
    Image,
    /// Writes the item to disk.
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub name: String,
    pub kind: CommandKind,
    /// `None` for conditions.
    pub effect: Option<ActionEffect>,
    pub args: Vec<ArgSpec>,
    pub default_policy: FailurePolicy,
}

impl CommandDescriptor {
    pub fn action(name: &str, effect: ActionEffect, args: Vec<ArgSpec>) -> Self {
        Self {
            name: name.to_string(),
            kind: CommandKind::Action,
            effect: Some(effect),
            args,
            default_policy: FailurePolicy::Recoverable,
        }
    }

    pub fn condition(name: &str, args: Vec<ArgSpec>) -> Self {
        Self {
            name: name.to_string(),
            kind: CommandKind::Condition,
            effect: None,
            args,
            default_policy: FailurePolicy::Recoverable,
        }
    }

    pub fn with_default_policy(mut self, policy: FailurePolicy) -> Self {
        self.default_policy = policy;
        self
    }

    fn spec(&self, name: &str) -> Option<&ArgSpec> {
        self.args.iter().find(|spec| spec.name == name)
    }
}

/// Known capabilities, keyed by command name.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    descriptors: BTreeMap<String, CommandDescriptor>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with the built-in actions and conditions.
    pub fn builtin() -> Self {
        let descriptors = [
            CommandDescriptor::action(
                "rename",
                ActionEffect::Name,
                vec![ArgSpec::required("pattern", ArgType::String)],
            ),
            CommandDescriptor::action("remove_folder_structure", ActionEffect::Name, vec![]),
            CommandDescriptor::action(
                "export",
                ActionEffect::Export,
                vec![
                    ArgSpec::optional("extension", ArgType::String),
                    ArgSpec::optional("format", ArgType::Json),
                ],
            ),
            CommandDescriptor::condition(
                "name_matches",
                vec![
                    ArgSpec::required("mode", ArgType::String),
                    ArgSpec::required("text", ArgType::String),
                    ArgSpec::optional("ignore_case", ArgType::Bool),
                ],
            ),
            CommandDescriptor::condition("kind", vec![ArgSpec::required("kinds", ArgType::StringList)]),
            CommandDescriptor::condition("visible", vec![ArgSpec::optional("visible", ArgType::Bool)]),
            CommandDescriptor::condition("top_level", vec![]),
            CommandDescriptor::condition("non_empty_group", vec![]),
            CommandDescriptor::condition(
                "file_extension",
                vec![ArgSpec::required("extensions", ArgType::StringList)],
            ),
            CommandDescriptor::condition("selected", vec![]),
            CommandDescriptor::condition("expression", vec![ArgSpec::required("expr", ArgType::Json)]),
        ];

        Self {
            descriptors: descriptors
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    /// Add a capability. Names must be unique.
    pub fn register(&mut self, descriptor: CommandDescriptor) -> Result<()> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(Error::Validation(format!(
                "command {} is already registered",
                descriptor.name
            )));
        }
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Add a host procedure: an image action executed by the host.
    pub fn register_host_procedure(&mut self, name: &str, args: Vec<ArgSpec>) -> Result<()> {
        self.register(CommandDescriptor::action(name, ActionEffect::Image, args))
    }

    pub fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.descriptors.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Effect of a command, if it is a registered action.
    pub fn effect_of(&self, command: &Command) -> Option<ActionEffect> {
        self.get(&command.name).and_then(|d| d.effect)
    }

    /// Check every enabled command (and its nested commands).
    pub fn validate(&self, commands: &[Command]) -> Result<()> {
        for command in commands.iter().filter(|c| c.enabled) {
            self.validate_one(command)?;
            self.validate(&command.children)?;
        }
        Ok(())
    }

    fn validate_one(&self, command: &Command) -> Result<()> {
        let descriptor = self.get(&command.name).ok_or_else(|| {
            Error::Validation(format!("unknown command {:?}", command.name))
        })?;

        if descriptor.kind != command.kind {
            return Err(Error::Validation(format!(
                "{} is registered as {:?} but configured as {:?}",
                command.name, descriptor.kind, command.kind
            )));
        }

        for spec in descriptor.args.iter().filter(|s| s.required) {
            if command.argument(&spec.name).is_none() {
                return Err(Error::Validation(format!(
                    "{}: missing required argument {:?}",
                    command.label(),
                    spec.name
                )));
            }
        }

        let mut constants = ArgMap::new();
        let mut all_constant = true;
        for arg in &command.arguments {
            let spec = descriptor.spec(&arg.name).ok_or_else(|| {
                Error::Validation(format!(
                    "{}: unknown argument {:?}",
                    command.label(),
                    arg.name
                ))
            })?;
            match &arg.value {
                ArgValue::Constant(value) => {
                    if !spec.ty.accepts(value) {
                        return Err(Error::Validation(format!(
                            "{}: argument {:?} must be {:?}, got {value}",
                            command.label(),
                            arg.name,
                            spec.ty
                        )));
                    }
                    constants.insert(arg.name.clone(), value.clone());
                }
                ArgValue::Placeholder(placeholder) => {
                    if !spec.ty.accepts_placeholder(*placeholder) {
                        return Err(Error::Validation(format!(
                            "{}: placeholder {placeholder:?} cannot fill {:?} argument {:?}",
                            command.label(),
                            spec.ty,
                            arg.name
                        )));
                    }
                    all_constant = false;
                }
            }
        }

        if command.kind == CommandKind::Condition && all_constant {
            compile_condition(&command.name, &constants)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_contains_core_capabilities() {
        let registry = CommandRegistry::builtin();
        for name in ["rename", "export", "remove_folder_structure", "kind", "expression"] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
        assert_eq!(
            registry.get("export").unwrap().effect,
            Some(ActionEffect::Export)
        );
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = CommandRegistry::builtin();
        assert!(registry.register_host_procedure("rename", vec![]).is_err());
        registry
            .register_host_procedure("blur", vec![ArgSpec::optional("radius", ArgType::Float)])
            .unwrap();
        assert_eq!(
            registry.get("blur").unwrap().effect,
            Some(ActionEffect::Image)
        );
    }

    #[test]
    fn unknown_command_is_rejected() {
        let registry = CommandRegistry::builtin();
        let err = registry
            .validate(&[Command::action("teleport")])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn disabled_commands_are_not_validated() {
        let registry = CommandRegistry::builtin();
        assert!(registry
            .validate(&[Command::action("teleport").disabled()])
            .is_ok());
    }

    #[test]
    fn kind_mismatch_and_missing_args() {
        let registry = CommandRegistry::builtin();
        assert!(registry.validate(&[Command::condition("rename")]).is_err());
        assert!(registry.validate(&[Command::action("rename")]).is_err());
        assert!(registry
            .validate(&[Command::action("rename").with_arg("pattern", "{name}")])
            .is_ok());
    }

    #[test]
    fn constant_types_are_checked() {
        let registry = CommandRegistry::builtin();
        let bad = Command::action("rename").with_arg("pattern", 5);
        assert!(registry.validate(&[bad]).is_err());

        let unknown_arg = Command::action("export").with_arg("quality", 90);
        assert!(registry.validate(&[unknown_arg]).is_err());
    }

    #[test]
    fn placeholders_must_fit_the_argument_type() {
        let registry = CommandRegistry::builtin();
        let ok = Command::action("rename").with_placeholder("pattern", Placeholder::ParentName);
        assert!(registry.validate(&[ok]).is_ok());

        let bad = Command::condition("visible").with_placeholder("visible", Placeholder::ItemKind);
        assert!(registry.validate(&[bad]).is_err());
    }

    #[test]
    fn conditions_are_built_during_validation() {
        let registry = CommandRegistry::builtin();
        let broken_regex = Command::condition("name_matches")
            .with_arg("mode", "regex")
            .with_arg("text", "(");
        assert!(registry.validate(&[broken_regex]).is_err());
    }

    #[test]
    fn nested_commands_are_validated() {
        let registry = CommandRegistry::builtin();
        let cmd = Command::condition("top_level").with_child(Command::action("teleport"));
        assert!(registry.validate(&[cmd]).is_err());
    }
}
