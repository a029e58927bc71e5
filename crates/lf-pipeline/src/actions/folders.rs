use async_trait::async_trait;
use lf_core::Result;

use crate::action::{Action, ActionResult};
use crate::context::{ActionContext, ItemState};
use crate::registry::ActionEffect;

/// Export the item directly into the output directory.
#[derive(Debug, Default)]
pub struct RemoveFolderStructureAction;

#[async_trait]
impl Action for RemoveFolderStructureAction {
    fn name(&self) -> &'static str {
        "Remove Folder Structure"
    }

    fn effect(&self) -> ActionEffect {
        ActionEffect::Name
    }

    async fn execute(&self, state: &mut ItemState, _ctx: &mut ActionContext<'_>) -> Result<ActionResult> {
        let dropped = state.folder.len();
        state.folder.clear();
        Ok(ActionResult::done(format!("Dropped {dropped} folder level(s)")))
    }
}
