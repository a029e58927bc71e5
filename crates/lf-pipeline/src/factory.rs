//! Action factory: construct [`Action`] objects from resolved commands.

use lf_core::{ArgMap, Error, Result};

use crate::action::Action;
use crate::actions::{ExportAction, HostProcedureAction, RemoveFolderStructureAction, RenameAction};
use crate::args;
use crate::registry::ActionEffect;

/// Build the action for command `name` with its resolved arguments.
///
/// Anything registered with an [`ActionEffect::Image`] effect is a host
/// procedure; the remaining names are the built-in actions.
///
/// # Errors
///
/// Returns [`Error::Validation`] for unknown actions and malformed arguments.
pub fn create_action(
    name: &str,
    effect: Option<ActionEffect>,
    args: &ArgMap,
) -> Result<Box<dyn Action>> {
    if effect == Some(ActionEffect::Image) {
        return Ok(Box::new(HostProcedureAction::new(name, args.clone())));
    }

    let action: Box<dyn Action> = match name {
        "rename" => Box::new(RenameAction::new(args::required_str(args, "pattern")?)),
        "remove_folder_structure" => Box::new(RemoveFolderStructureAction),
        "export" => Box::new(ExportAction::new(
            args::optional_str(args, "extension")?.map(str::to_string),
            args::object_or_empty(args, "format")?,
        )),
        other => {
            return Err(Error::Validation(format!("unknown action {other:?}")));
        }
    };
    Ok(action)
}
