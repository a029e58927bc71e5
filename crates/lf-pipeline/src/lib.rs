//! # lf-pipeline
//!
//! The command pipeline applied to every item of a batch.
//!
//! This crate provides:
//!
//! - **[`Command`]** -- the persisted command model (actions, conditions,
//!   arguments with placeholders, nesting).
//! - **[`CommandRegistry`]** -- capability descriptors used to validate a
//!   command list before a run.
//! - **[`Action`]** trait and built-in [`actions`] -- rename, remove folder
//!   structure, export, host procedures.
//! - **[`PipelineExecutor`]** -- runs the flattened command list over a
//!   traversal, in run or preview mode, and produces an [`ExecutionReport`].

pub mod action;
pub mod actions;
pub mod args;
pub mod command;
pub mod conditions;
pub mod context;
pub mod executor;
pub mod factory;
pub mod placeholder;
pub mod plan;
pub mod registry;
pub mod report;
pub mod template;

// Re-export key types at the crate root.
pub use action::{Action, ActionOutcome, ActionResult};
pub use command::{
    find_command, Applicability, ArgValue, Argument, Command, CommandKind, FailurePolicy,
    MoreOptions, Placeholder,
};
pub use conditions::{build_condition, compile_condition};
pub use context::{
    ActionContext, DeferredAction, ExecutionMode, ItemState, OutputOptions, ProgressSender,
};
pub use executor::PipelineExecutor;
pub use factory::create_action;
pub use plan::{plan, PlannedCommand};
pub use registry::{ActionEffect, ArgSpec, ArgType, CommandDescriptor, CommandRegistry};
pub use report::{CommandIssue, ExecutionReport, ItemOutcome, ItemStatus, RunStatus};
