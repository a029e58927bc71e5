//! The [`Action`] trait defines a single pipeline step applied to one item.

use async_trait::async_trait;
use lf_core::Result;

use crate::context::{ActionContext, ItemState};
use crate::registry::ActionEffect;

/// What the executor should do after a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Continue with the next command.
    Continue,
    /// Stop processing this item; the run goes on.
    Skipped(String),
    /// Stop the whole run.
    CancelRun,
}

/// Result of a successfully executed action.
#[derive(Debug, Clone)]
pub struct ActionResult {
    /// Human-readable summary of what the action did.
    pub summary: String,
    pub outcome: ActionOutcome,
}

impl ActionResult {
    pub fn done(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            outcome: ActionOutcome::Continue,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            summary: reason.clone(),
            outcome: ActionOutcome::Skipped(reason),
        }
    }

    pub fn cancel_run(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            outcome: ActionOutcome::CancelRun,
        }
    }
}

/// A single action step.
///
/// Implementors change the item state (name, folder, output path) and may
/// call into the host. In preview mode they must not produce side effects
/// on the host's original items.
#[async_trait]
pub trait Action: Send + Sync {
    /// A short, human-readable name for this action (e.g. "Export").
    fn name(&self) -> &'static str;

    fn effect(&self) -> ActionEffect;

    async fn execute(&self, state: &mut ItemState, ctx: &mut ActionContext<'_>) -> Result<ActionResult>;
}
