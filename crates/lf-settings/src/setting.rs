//! A single named setting with its default, constraint and persistence.

use lf_core::{Error, Result};
use lf_output::naming::validate_extension;

use crate::value::SettingValue;

/// Extra rule a value must satisfy beyond having the right type.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Any,
    IntRange { min: i64, max: i64 },
    /// Allowed texts of a `choice` or `string` value.
    OneOf(Vec<String>),
    /// Strings, paths and lists must not be empty.
    NonEmpty,
    FileExtension,
}

impl Constraint {
    pub fn one_of<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Constraint::OneOf(options.into_iter().map(Into::into).collect())
    }

    fn check(&self, value: &SettingValue) -> std::result::Result<(), String> {
        match (self, value) {
            (Constraint::Any, _) => Ok(()),
            (Constraint::IntRange { min, max }, SettingValue::Int(n)) => {
                if (*min..=*max).contains(n) {
                    Ok(())
                } else {
                    Err(format!("{n} is outside {min}..={max}"))
                }
            }
            (Constraint::OneOf(options), v) => match v.as_str() {
                Some(s) if options.iter().any(|o| o == s) => Ok(()),
                Some(s) => Err(format!("{s:?} is not one of {}", options.join(", "))),
                None => Err("expected a string".into()),
            },
            (Constraint::NonEmpty, v) => {
                let empty = match v {
                    SettingValue::String(s) | SettingValue::Choice(s) => s.trim().is_empty(),
                    SettingValue::Path(p) => p.as_os_str().is_empty(),
                    SettingValue::StringList(items) => items.is_empty(),
                    SettingValue::IdList(ids) => ids.is_empty(),
                    _ => false,
                };
                if empty {
                    Err("value must not be empty".into())
                } else {
                    Ok(())
                }
            }
            (Constraint::FileExtension, SettingValue::String(ext)) => {
                validate_extension(ext).map_err(|e| e.to_string())
            }
            (constraint, v) => Err(format!("{constraint:?} does not apply to {}", v.value_type())),
        }
    }
}

/// Whether a setting is written to the settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    Persistent,
    /// Lives for the current session only.
    Session,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    name: String,
    default: SettingValue,
    value: SettingValue,
    constraint: Constraint,
    persistence: Persistence,
}

impl Setting {
    pub fn new(name: impl Into<String>, default: SettingValue) -> Self {
        Self {
            name: name.into(),
            value: default.clone(),
            default,
            constraint: Constraint::Any,
            persistence: Persistence::Persistent,
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraint = constraint;
        self
    }

    /// Builder: keep this setting out of the settings document.
    pub fn session(mut self) -> Self {
        self.persistence = Persistence::Session;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SettingValue {
        &self.value
    }

    pub fn default_value(&self) -> &SettingValue {
        &self.default
    }

    pub fn persistence(&self) -> Persistence {
        self.persistence
    }

    pub fn is_persistent(&self) -> bool {
        self.persistence == Persistence::Persistent
    }

    pub fn is_default(&self) -> bool {
        self.value == self.default
    }

    /// Check a candidate value: same type as the default, and the constraint.
    pub fn validate(&self, value: &SettingValue) -> Result<()> {
        if value.value_type() != self.default.value_type() {
            return Err(Error::Validation(format!(
                "{}: expected {}, got {}",
                self.name,
                self.default.value_type(),
                value.value_type()
            )));
        }
        self.constraint
            .check(value)
            .map_err(|reason| Error::Validation(format!("{}: {reason}", self.name)))
    }

    /// Replace the value. Returns whether it changed.
    pub fn set(&mut self, value: SettingValue) -> Result<bool> {
        self.validate(&value)?;
        if self.value == value {
            return Ok(false);
        }
        self.value = value;
        Ok(true)
    }

    /// Restore the default. Returns whether it changed.
    pub fn reset(&mut self) -> bool {
        if self.is_default() {
            return false;
        }
        self.value = self.default.clone();
        true
    }
}
