//! Typed accessors for resolved argument maps.

use lf_core::{ArgMap, Error, Result};
use serde_json::Value;

pub fn required_str<'a>(args: &'a ArgMap, name: &str) -> Result<&'a str> {
    optional_str(args, name)?
        .ok_or_else(|| Error::Validation(format!("missing argument {name:?}")))
}

pub fn optional_str<'a>(args: &'a ArgMap, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(Error::Validation(format!(
            "argument {name:?} must be a string, got {other}"
        ))),
    }
}

pub fn bool_or(args: &ArgMap, name: &str, default: bool) -> Result<bool> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(Error::Validation(format!(
            "argument {name:?} must be a boolean, got {other}"
        ))),
    }
}

pub fn string_list(args: &ArgMap, name: &str) -> Result<Vec<String>> {
    let items = args
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Validation(format!("argument {name:?} must be a list of strings")))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                Error::Validation(format!("argument {name:?} must be a list of strings"))
            })
        })
        .collect()
}

/// A JSON object argument, or an empty map when absent.
pub fn object_or_empty(args: &ArgMap, name: &str) -> Result<ArgMap> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(ArgMap::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(Error::Validation(format!(
            "argument {name:?} must be an object, got {other}"
        ))),
    }
}
