//! Rename action: set the processed name from a pattern.

use async_trait::async_trait;
use lf_core::{Error, Result};

use crate::action::{Action, ActionResult};
use crate::context::{ActionContext, ItemState};
use crate::registry::ActionEffect;
use crate::template::NameTemplate;

/// Rename the item's output using a pattern such as `{parent}_{name}_{n:3}`.
#[derive(Debug)]
pub struct RenameAction {
    pattern: String,
}

impl RenameAction {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
        }
    }
}

#[async_trait]
impl Action for RenameAction {
    fn name(&self) -> &'static str {
        "Rename"
    }

    fn effect(&self) -> ActionEffect {
        ActionEffect::Name
    }

    async fn execute(&self, state: &mut ItemState, ctx: &mut ActionContext<'_>) -> Result<ActionResult> {
        let template = NameTemplate::new(ctx.sequence)
            .with_var("name", &state.name)
            .with_var("original", &state.original_name)
            .with_var("parent", &ctx.parent_name(state.item_id))
            .with_var("folder", &state.folder.join("/"))
            .with_var("kind", &state.kind.to_string());

        let renamed = template.render(&self.pattern)?;
        let renamed = renamed.trim();
        if renamed.is_empty() {
            return Err(Error::Validation(format!(
                "pattern {:?} produced an empty name for {}",
                self.pattern, state.original_name
            )));
        }

        let summary = format!("Renamed {} to {renamed}", state.name);
        state.name = renamed.to_string();
        Ok(ActionResult::done(summary))
    }
}
