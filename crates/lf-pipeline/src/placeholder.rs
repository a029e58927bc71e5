//! Resolve command arguments against the item being processed.

use lf_core::ArgMap;
use lf_items::ItemTree;
use serde_json::Value;

use crate::command::{ArgValue, Argument, Placeholder};
use crate::context::{parent_name, ItemState, OutputOptions};

/// Produce the concrete argument map for one command and one item.
pub fn resolve_arguments(
    arguments: &[Argument],
    state: &ItemState,
    tree: &ItemTree,
    output: &OutputOptions,
) -> ArgMap {
    arguments
        .iter()
        .map(|arg| {
            let value = match &arg.value {
                ArgValue::Constant(value) => value.clone(),
                ArgValue::Placeholder(p) => placeholder_value(*p, state, tree, output),
            };
            (arg.name.clone(), value)
        })
        .collect()
}

/// The argument map when every argument is a constant, `None` otherwise.
pub fn constant_arguments(arguments: &[Argument]) -> Option<ArgMap> {
    arguments
        .iter()
        .map(|arg| match &arg.value {
            ArgValue::Constant(value) => Some((arg.name.clone(), value.clone())),
            ArgValue::Placeholder(_) => None,
        })
        .collect()
}

fn placeholder_value(
    placeholder: Placeholder,
    state: &ItemState,
    tree: &ItemTree,
    output: &OutputOptions,
) -> Value {
    match placeholder {
        Placeholder::CurrentItemName => Value::from(state.name.as_str()),
        Placeholder::CurrentItemId => Value::from(state.item_id.raw()),
        Placeholder::ParentName => Value::from(parent_name(tree, state.item_id)),
        Placeholder::FolderPath => Value::from(state.folder.join("/")),
        Placeholder::ItemKind => Value::from(state.kind.to_string()),
        Placeholder::OutputDirectory => Value::from(output.directory.display().to_string()),
        Placeholder::FileExtension => Value::from(output.file_extension.as_str()),
    }
}
