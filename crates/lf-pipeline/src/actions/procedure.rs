//! Host procedure action: an image operation executed by the host.

use async_trait::async_trait;
use lf_core::{ArgMap, Error, Result};

use crate::action::{Action, ActionResult};
use crate::context::{ActionContext, DeferredAction, ItemState};
use crate::registry::ActionEffect;

#[derive(Debug)]
pub struct HostProcedureAction {
    procedure: String,
    args: ArgMap,
}

impl HostProcedureAction {
    pub fn new(procedure: impl Into<String>, args: ArgMap) -> Self {
        Self {
            procedure: procedure.into(),
            args,
        }
    }
}

#[async_trait]
impl Action for HostProcedureAction {
    fn name(&self) -> &'static str {
        "Host Procedure"
    }

    fn effect(&self) -> ActionEffect {
        ActionEffect::Image
    }

    async fn execute(&self, state: &mut ItemState, ctx: &mut ActionContext<'_>) -> Result<ActionResult> {
        if ctx.is_preview() {
            state.deferred.push(DeferredAction {
                command_id: ctx.command_id,
                procedure: self.procedure.clone(),
                args: self.args.clone(),
            });
            return Ok(ActionResult::done(format!("Deferred {}", self.procedure)));
        }

        ctx.host
            .apply_action(state.working_item, &self.procedure, &self.args)
            .await
            .map_err(|e| match e {
                Error::Cancelled => Error::Cancelled,
                other => Error::action(&self.procedure, other.to_string()),
            })?;
        Ok(ActionResult::done(format!(
            "Applied {} to {}",
            self.procedure, state.item_id
        )))
    }
}
