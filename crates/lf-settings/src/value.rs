//! Typed setting values.

use std::fmt;
use std::path::{Path, PathBuf};

use lf_pipeline::Command;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A setting value. Serialized as `{"type": ..., "value": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Path(PathBuf),
    /// One of a fixed set of options.
    Choice(String),
    StringList(Vec<String>),
    /// Host item ids.
    IdList(Vec<u64>),
    Commands(Vec<Command>),
    Json(Value),
}

/// The type tag of a [`SettingValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    Path,
    Choice,
    StringList,
    IdList,
    Commands,
    Json,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Path => "path",
            Self::Choice => "choice",
            Self::StringList => "string_list",
            Self::IdList => "id_list",
            Self::Commands => "commands",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl SettingValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::String(_) => ValueType::String,
            Self::Path(_) => ValueType::Path,
            Self::Choice(_) => ValueType::Choice,
            Self::StringList(_) => ValueType::StringList,
            Self::IdList(_) => ValueType::IdList,
            Self::Commands(_) => ValueType::Commands,
            Self::Json(_) => ValueType::Json,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// The text of a `string` or `choice` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_id_list(&self) -> Option<&[u64]> {
        match self {
            Self::IdList(ids) => Some(ids),
            _ => None,
        }
    }

    pub fn as_commands(&self) -> Option<&[Command]> {
        match self {
            Self::Commands(cmds) => Some(cmds),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) | Self::Choice(s) => f.write_str(s),
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::StringList(items) => write!(f, "{}", items.join(", ")),
            Self::IdList(ids) => {
                let ids: Vec<_> = ids.iter().map(u64::to_string).collect();
                write!(f, "[{}]", ids.join(", "))
            }
            Self::Commands(cmds) => write!(f, "{} command(s)", cmds.len()),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}
