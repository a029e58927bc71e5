//! Pipeline executor: runs the configured commands over every item, in
//! stored order, with cancellation between items and progress reporting.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use lf_core::{CommandId, Error, ItemId, ItemKind, Result, RunMode};
use lf_items::{Enumeration, Host, Item, ItemTree, Visit};
use lf_output::{OverwriteDecider, OverwriteResolver, Uniquifier};
use lf_rules::{CompiledExpr, Subject};
use tokio_util::sync::CancellationToken;

use crate::action::ActionOutcome;
use crate::command::{Applicability, Command, CommandKind, FailurePolicy};
use crate::conditions::compile_condition;
use crate::context::{ActionContext, DeferredAction, ExecutionMode, ItemState, OutputOptions, ProgressSender};
use crate::factory::create_action;
use crate::placeholder::{constant_arguments, resolve_arguments};
use crate::plan::{plan, PlannedCommand};
use crate::registry::{ActionEffect, CommandRegistry};
use crate::report::{CommandIssue, ExecutionReport, ItemOutcome, ItemStatus, RunStatus};

/// How processing of one item ended.
enum ItemStep {
    Done(ItemStatus),
    CancelRun,
    Abort { command: String, message: String },
}

/// Mutable state shared by all items of one run.
struct RunState<'r> {
    uniquifier: Uniquifier,
    resolver: Option<OverwriteResolver>,
    counters: HashMap<CommandId, u64>,
    report: &'r mut ExecutionReport,
}

/// Runs a command list over a sequence of items.
///
/// The command list is validated against the [`CommandRegistry`] before any
/// item is touched. In [`ExecutionMode::Run`] the overwrite mode is checked
/// against the run mode up front too, so `ask` in a non-interactive run
/// fails with [`Error::ConflictResolution`] before processing starts.
pub struct PipelineExecutor {
    registry: Arc<CommandRegistry>,
    commands: Vec<Command>,
    output: OutputOptions,
    run_mode: RunMode,
    mode: ExecutionMode,
    decider: Option<Arc<dyn OverwriteDecider>>,
    selection: BTreeSet<ItemId>,
    cancellation: CancellationToken,
    progress: Arc<ProgressSender>,
}

impl PipelineExecutor {
    pub fn new(registry: Arc<CommandRegistry>, commands: Vec<Command>, output: OutputOptions) -> Self {
        Self {
            registry,
            commands,
            output,
            run_mode: RunMode::Interactive,
            mode: ExecutionMode::Run,
            decider: None,
            selection: BTreeSet::new(),
            cancellation: CancellationToken::new(),
            progress: Arc::new(ProgressSender::noop()),
        }
    }

    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Builder: attach the decider asked in `ask` overwrite mode.
    pub fn with_decider(mut self, decider: Arc<dyn OverwriteDecider>) -> Self {
        self.decider = Some(decider);
        self
    }

    /// Builder: items treated as selected by `selected_only` commands and
    /// the `selected` condition.
    pub fn with_selection(mut self, selection: BTreeSet<ItemId>) -> Self {
        self.selection = selection;
        self
    }

    /// Builder: attach a cancellation token, checked between items.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn output(&self) -> &OutputOptions {
        &self.output
    }

    /// Validate and flatten the command list.
    pub fn plan(&self) -> Result<Vec<PlannedCommand>> {
        plan(&self.commands, &self.registry)
    }

    /// Run over everything an enumeration yields.
    pub async fn run_enumeration(&self, host: &dyn Host, enumeration: &Enumeration) -> Result<ExecutionReport> {
        self.run(host, enumeration.tree(), enumeration.iter()).await
    }

    /// Run the pipeline over `items`, which must come from `tree`.
    ///
    /// # Errors
    ///
    /// Only problems found before the first item are returned as errors:
    /// invalid commands and overwrite settings the run mode does not allow.
    /// Everything after that is recorded in the report, including a fatal
    /// abort.
    pub async fn run<'t, I>(&self, host: &dyn Host, tree: &'t ItemTree, items: I) -> Result<ExecutionReport>
    where
        I: IntoIterator<Item = Visit<'t>>,
    {
        let planned = self.plan()?;
        let conditions = self.prepare_conditions(&planned)?;
        let resolver = match self.mode {
            ExecutionMode::Run => Some(self.resolver()?),
            ExecutionMode::Preview => None,
        };

        let visits: Vec<Visit<'t>> = items.into_iter().collect();
        let total = visits.len();
        let mut report = ExecutionReport::new(self.mode, self.run_mode);
        let mut run = RunState {
            uniquifier: Uniquifier::new(),
            resolver,
            counters: HashMap::new(),
            report: &mut report,
        };

        tracing::info!(
            "Starting {:?} over {} item(s) with {} command(s)",
            self.mode,
            total,
            planned.len()
        );

        for (index, visit) in visits.iter().enumerate() {
            if self.cancellation.is_cancelled() {
                tracing::info!("Run cancelled after {index} of {total} item(s)");
                run.report.status = RunStatus::Cancelled;
                break;
            }

            let selected = self.is_selected(tree, visit.item.id);
            let mut state = ItemState::new(visit, selected);
            let step = self
                .process_item(host, tree, &planned, &conditions, &mut state, &mut run)
                .await;

            let status = match step {
                ItemStep::Done(status) => status,
                ItemStep::CancelRun => {
                    tracing::info!("Run cancelled at {}", state.original_name);
                    run.report.status = RunStatus::Cancelled;
                    run.report.items.push(outcome(state, ItemStatus::Skipped {
                        reason: "run cancelled".into(),
                    }));
                    break;
                }
                ItemStep::Abort { command, message } => {
                    tracing::error!("Aborting run: {command} failed for {}: {message}", state.original_name);
                    run.report.status = RunStatus::Aborted {
                        command: command.clone(),
                        item: state.item_id,
                        message: message.clone(),
                    };
                    run.report.items.push(outcome(state, ItemStatus::Failed {
                        command,
                        error: message,
                    }));
                    break;
                }
            };

            tracing::debug!("{} -> {:?}", state.original_name, status);
            let name = state.original_name.clone();
            run.report.items.push(outcome(state, status));
            self.progress.send((index + 1) as f32 / total as f32, &name);
        }

        tracing::info!(
            "Finished with {:?}: {} processed, {} excluded, {} skipped, {} failed",
            report.status,
            report.processed(),
            report.excluded(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    /// Compile, once per run, every condition whose arguments are all
    /// constants. Conditions with placeholders are compiled per item.
    pub fn prepare_conditions(&self, planned: &[PlannedCommand]) -> Result<Vec<Option<CompiledExpr>>> {
        planned
            .iter()
            .map(|step| {
                if !step.is_condition() || !step.runs_in(self.mode) {
                    return Ok(None);
                }
                constant_arguments(&step.command.arguments)
                    .map(|args| compile_condition(&step.command.name, &args))
                    .transpose()
            })
            .collect()
    }

    /// Recompute the image actions deferred for `outcomes` of an earlier
    /// preview of the same items, without simulating names again.
    ///
    /// Image actions change neither names nor inclusion, so this is valid as
    /// long as only image commands changed since `outcomes` were produced.
    /// Returns `Ok(false)` and leaves `outcomes` alone when the deferred
    /// lists cannot be rebuilt this way: an image command takes placeholder
    /// arguments, or an included item stopped before the end of the list.
    pub fn refresh_deferred(&self, tree: &ItemTree, outcomes: &mut [ItemOutcome]) -> Result<bool> {
        let planned = self.plan()?;
        let mut images = Vec::new();
        for step in &planned {
            if step.effect != Some(ActionEffect::Image) || !step.runs_in(ExecutionMode::Preview) {
                continue;
            }
            let Some(args) = constant_arguments(&step.command.arguments) else {
                return Ok(false);
            };
            images.push((step, args));
        }
        if outcomes
            .iter()
            .any(|o| matches!(o.status, ItemStatus::Skipped { .. } | ItemStatus::Failed { .. }))
        {
            return Ok(false);
        }

        for outcome in outcomes.iter_mut().filter(|o| o.status == ItemStatus::Processed) {
            let selected = self.is_selected(tree, outcome.item_id);
            outcome.deferred = images
                .iter()
                .filter(|(step, _)| step.scope == Applicability::All || selected)
                .map(|(step, args)| DeferredAction {
                    command_id: step.command.id,
                    procedure: step.command.name.clone(),
                    args: args.clone(),
                })
                .collect();
        }
        Ok(true)
    }

    fn resolver(&self) -> Result<OverwriteResolver> {
        let mut resolver = OverwriteResolver::new(self.output.overwrite_mode, self.run_mode)?;
        if let Some(decider) = &self.decider {
            resolver = resolver.with_decider(decider.clone());
        }
        resolver.validate()?;
        Ok(resolver)
    }

    fn is_selected(&self, tree: &ItemTree, id: ItemId) -> bool {
        !self.selection.is_empty() && tree.is_within(id, &self.selection)
    }

    async fn process_item(
        &self,
        host: &dyn Host,
        tree: &ItemTree,
        planned: &[PlannedCommand],
        conditions: &[Option<CompiledExpr>],
        state: &mut ItemState,
        run: &mut RunState<'_>,
    ) -> ItemStep {
        for (step, prepared) in planned.iter().zip(conditions) {
            if !step.runs_in(self.mode) {
                continue;
            }
            if step.scope == Applicability::SelectedOnly && !state.selected {
                continue;
            }

            let command = &step.command;

            match command.kind {
                CommandKind::Condition => {
                    let per_item;
                    let expr = match prepared {
                        Some(expr) => expr,
                        None => {
                            let args = resolve_arguments(&command.arguments, state, tree, &self.output);
                            match compile_condition(&command.name, &args) {
                                Ok(expr) => per_item = expr,
                                Err(e) => return self.on_error(step, state, e, run),
                            }
                            &per_item
                        }
                    };
                    if !self.admits(expr, step, state, tree) {
                        tracing::debug!("{} excluded by {}", state.original_name, command.label());
                        return ItemStep::Done(ItemStatus::Excluded {
                            command: command.label().to_string(),
                        });
                    }
                }
                CommandKind::Action => {
                    let args = resolve_arguments(&command.arguments, state, tree, &self.output);
                    let action = match create_action(&command.name, step.effect, &args) {
                        Ok(action) => action,
                        Err(e) => return self.on_error(step, state, e, run),
                    };
                    let sequence = {
                        let counter = run.counters.entry(command.id).or_insert(0);
                        *counter += 1;
                        *counter
                    };

                    let mut ctx = ActionContext {
                        host,
                        tree,
                        output: &self.output,
                        uniquifier: &mut run.uniquifier,
                        resolver: run.resolver.as_mut(),
                        mode: self.mode,
                        command_id: command.id,
                        sequence,
                    };

                    match action.execute(state, &mut ctx).await {
                        Ok(result) => {
                            tracing::debug!("{}: {}", action.name(), result.summary);
                            state.applied.push(command.id);
                            match result.outcome {
                                ActionOutcome::Continue => {}
                                ActionOutcome::Skipped(reason) => {
                                    return ItemStep::Done(ItemStatus::Skipped { reason });
                                }
                                ActionOutcome::CancelRun => return ItemStep::CancelRun,
                            }
                        }
                        Err(e) => return self.on_error(step, state, e, run),
                    }
                }
            }
        }

        ItemStep::Done(ItemStatus::Processed)
    }

    /// Evaluate a condition on the item, and on its enclosing groups when
    /// the command asks for it.
    fn admits(&self, expr: &CompiledExpr, step: &PlannedCommand, state: &ItemState, tree: &ItemTree) -> bool {
        if !expr.evaluate(&state.subject()) {
            return false;
        }
        if !step.command.more_options.also_apply_to_parent_folders {
            return true;
        }
        tree.parents(state.item_id)
            .into_iter()
            .filter(|parent| parent.kind == ItemKind::Group)
            .all(|parent| expr.evaluate(&self.subject_of(parent, tree)))
    }

    fn subject_of<'i>(&self, item: &'i Item, tree: &ItemTree) -> Subject<'i> {
        Subject {
            name: &item.name,
            kind: item.kind,
            visible: item.visible,
            depth: item.depth,
            child_count: item.children.len(),
            selected: self.is_selected(tree, item.id),
        }
    }

    fn on_error(&self, step: &PlannedCommand, state: &ItemState, err: Error, run: &mut RunState<'_>) -> ItemStep {
        let command = step.command.label().to_string();
        let issue = CommandIssue {
            command_id: step.command.id,
            command: command.clone(),
            item: state.item_id,
            message: err.to_string(),
        };

        match err {
            Error::Cancelled => ItemStep::CancelRun,
            Error::Validation(reason) => {
                tracing::warn!("Skipping {}: {command}: {reason}", state.original_name);
                run.report.skipped_commands.push(issue);
                ItemStep::Done(ItemStatus::Skipped { reason })
            }
            err if !err.is_recoverable() || step.policy == FailurePolicy::Fatal => ItemStep::Abort {
                command,
                message: err.to_string(),
            },
            err => {
                tracing::warn!("{command} failed for {}: {err}", state.original_name);
                run.report.failed_commands.push(issue);
                ItemStep::Done(ItemStatus::Failed {
                    command,
                    error: err.to_string(),
                })
            }
        }
    }
}

fn outcome(state: ItemState, status: ItemStatus) -> ItemOutcome {
    ItemOutcome {
        item_id: state.item_id,
        original_name: state.original_name,
        name: state.name,
        output: state.output,
        status,
        applied: state.applied,
        deferred: state.deferred,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Placeholder;
    use crate::registry::ArgSpec;
    use lf_core::{OverwriteMode, TraversalMode};
    use lf_items::{MemoryHost, Scope, Traverser};
    use lf_output::{FixedDecider, OverwriteDecision};
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // -- Helpers --------------------------------------------------------------

    struct Fixture {
        host: MemoryHost,
        enumeration: Enumeration,
        ids: HashMap<&'static str, ItemId>,
    }

    // image
    //   bg
    //   icons/
    //     cat
    //     _hidden
    //   title
    async fn fixture(mode: TraversalMode) -> Fixture {
        let host = MemoryHost::new().with_file_output(true);
        let mut ids = HashMap::new();
        let image = host.add_root("poster.xcf", ItemKind::Image);
        ids.insert("image", image);
        ids.insert("bg", host.add_child(image, "bg", ItemKind::Layer));
        let icons = host.add_child(image, "icons", ItemKind::Group);
        ids.insert("icons", icons);
        ids.insert("cat", host.add_child(icons, "cat", ItemKind::Layer));
        ids.insert("_hidden", host.add_child(icons, "_hidden", ItemKind::Layer));
        ids.insert("title", host.add_child(image, "title", ItemKind::Layer));

        let enumeration = Traverser::new(&host).enumerate(mode, Scope::All).await.unwrap();
        Fixture { host, enumeration, ids }
    }

    fn registry() -> Arc<CommandRegistry> {
        let mut registry = CommandRegistry::builtin();
        registry
            .register_host_procedure("blur", vec![ArgSpec::optional("radius", crate::registry::ArgType::Float)])
            .unwrap();
        Arc::new(registry)
    }

    fn layers_only() -> Command {
        Command::condition("kind").with_arg("kinds", json!(["layer"]))
    }

    fn output_in(dir: &Path, overwrite_mode: OverwriteMode) -> OutputOptions {
        OutputOptions {
            directory: dir.to_path_buf(),
            overwrite_mode,
            ..OutputOptions::default()
        }
    }

    // -- Tests ----------------------------------------------------------------

    #[tokio::test]
    async fn exports_layers_into_group_folders() {
        let f = fixture(TraversalMode::Hierarchical).await;
        let dir = tempfile::tempdir().unwrap();
        let executor = PipelineExecutor::new(
            registry(),
            vec![layers_only(), Command::action("export")],
            output_in(dir.path(), OverwriteMode::RenameNew),
        );

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.items.len(), 6);
        assert_eq!(report.processed(), 4);
        assert_eq!(report.excluded(), 2);
        assert!(dir.path().join("icons").join("cat.png").exists());
        assert!(dir.path().join("bg.png").exists());
        assert_eq!(f.host.exports().len(), 4);
    }

    #[tokio::test]
    async fn conditions_only_guard_later_actions() {
        let f = fixture(TraversalMode::Flat).await;
        let dir = tempfile::tempdir().unwrap();
        let commands = vec![
            Command::action("rename").with_arg("pattern", "x_{name}"),
            Command::condition("name_matches")
                .with_arg("mode", "starts_with")
                .with_arg("text", "x_c"),
            Command::action("export"),
        ];
        let executor = PipelineExecutor::new(registry(), commands, output_in(dir.path(), OverwriteMode::Replace))
            .with_mode(ExecutionMode::Preview);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        let cat = report.outcome(f.ids["cat"]).unwrap();
        assert_eq!(cat.status, ItemStatus::Processed);
        assert_eq!(cat.name, "x_cat");
        assert_eq!(cat.output, Some(dir.path().join("x_cat.png")));

        // Renamed, then excluded before export.
        let bg = report.outcome(f.ids["bg"]).unwrap();
        assert_eq!(bg.name, "x_bg");
        assert!(bg.output.is_none());
        assert!(matches!(bg.status, ItemStatus::Excluded { .. }));
    }

    #[tokio::test]
    async fn nested_condition_short_circuits() {
        let f = fixture(TraversalMode::Flat).await;
        let commands = vec![
            layers_only().with_child(
                Command::condition("name_matches")
                    .with_arg("mode", "does_not_start_with")
                    .with_arg("text", "_"),
            ),
            Command::action("rename").with_arg("pattern", "{name}!"),
        ];
        let executor = PipelineExecutor::new(registry(), commands, OutputOptions::default())
            .with_mode(ExecutionMode::Preview);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        let hidden = report.outcome(f.ids["_hidden"]).unwrap();
        assert_eq!(hidden.name, "_hidden");
        assert!(matches!(hidden.status, ItemStatus::Excluded { .. }));
        assert_eq!(report.outcome(f.ids["cat"]).unwrap().name, "cat!");
    }

    #[tokio::test]
    async fn disabled_commands_never_run() {
        let f = fixture(TraversalMode::Flat).await;
        let commands = vec![
            layers_only(),
            Command::action("rename").with_arg("pattern", "renamed").disabled(),
        ];
        let executor = PipelineExecutor::new(registry(), commands, OutputOptions::default())
            .with_mode(ExecutionMode::Preview);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.outcome(f.ids["cat"]).unwrap().name, "cat");
    }

    #[tokio::test]
    async fn duplicate_names_are_uniquified_in_flat_mode() {
        let (host, enumeration, first, second) = two_cats().await;
        let dir = tempfile::tempdir().unwrap();
        let executor = PipelineExecutor::new(
            registry(),
            vec![layers_only(), Command::action("export")],
            output_in(dir.path(), OverwriteMode::RenameNew),
        )
        .with_run_mode(RunMode::NonInteractive);

        let report = executor.run_enumeration(&host, &enumeration).await.unwrap();
        assert_eq!(report.outcome(first).unwrap().output, Some(dir.path().join("cat.png")));
        assert_eq!(report.outcome(second).unwrap().output, Some(dir.path().join("cat (1).png")));
    }

    async fn two_cats() -> (MemoryHost, Enumeration, ItemId, ItemId) {
        let host = MemoryHost::new().with_file_output(true);
        let image = host.add_root("sheet", ItemKind::Image);
        let a = host.add_child(image, "set-a", ItemKind::Group);
        let b = host.add_child(image, "set-b", ItemKind::Group);
        let first = host.add_child(a, "cat", ItemKind::Layer);
        let second = host.add_child(b, "cat", ItemKind::Layer);
        let enumeration = Traverser::new(&host)
            .enumerate(TraversalMode::Flat, Scope::All)
            .await
            .unwrap();
        (host, enumeration, first, second)
    }

    #[tokio::test]
    async fn rename_new_continues_the_suffix_sequence_past_existing_files() {
        let (host, enumeration, first, second) = two_cats().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.png"), "old").unwrap();

        let executor = PipelineExecutor::new(
            registry(),
            vec![layers_only(), Command::action("export")],
            output_in(dir.path(), OverwriteMode::RenameNew),
        )
        .with_run_mode(RunMode::NonInteractive);

        let report = executor.run_enumeration(&host, &enumeration).await.unwrap();
        assert_eq!(report.outcome(first).unwrap().output, Some(dir.path().join("cat (1).png")));
        assert_eq!(report.outcome(second).unwrap().output, Some(dir.path().join("cat (2).png")));
        assert_eq!(std::fs::read_to_string(dir.path().join("cat.png")).unwrap(), "old");
    }

    #[tokio::test]
    async fn skipped_export_leaves_the_name_free() {
        let (host, enumeration, first, second) = two_cats().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cat.png"), "old").unwrap();
        let decider = Arc::new(FixedDecider(OverwriteDecision::once(OverwriteMode::Skip)));

        let executor = PipelineExecutor::new(
            registry(),
            vec![layers_only(), Command::action("export")],
            output_in(dir.path(), OverwriteMode::Ask),
        )
        .with_decider(decider);

        let report = executor.run_enumeration(&host, &enumeration).await.unwrap();
        assert!(matches!(report.outcome(first).unwrap().status, ItemStatus::Skipped { .. }));
        assert!(matches!(report.outcome(second).unwrap().status, ItemStatus::Skipped { .. }));
        assert!(!dir.path().join("cat (1).png").exists());
    }

    #[tokio::test]
    async fn ask_without_interaction_fails_before_processing() {
        let f = fixture(TraversalMode::Flat).await;
        let dir = tempfile::tempdir().unwrap();
        let executor = PipelineExecutor::new(
            registry(),
            vec![Command::action("export")],
            output_in(dir.path(), OverwriteMode::Ask),
        )
        .with_run_mode(RunMode::NonInteractive);

        let err = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap_err();
        assert!(matches!(err, Error::ConflictResolution(_)));
        assert!(f.host.exports().is_empty());
    }

    #[tokio::test]
    async fn overwrite_cancel_stops_the_run() {
        let f = fixture(TraversalMode::Flat).await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bg.png"), "old").unwrap();

        let executor = PipelineExecutor::new(
            registry(),
            vec![layers_only(), Command::action("export")],
            output_in(dir.path(), OverwriteMode::Ask),
        )
        .with_decider(Arc::new(FixedDecider(OverwriteDecision::once(OverwriteMode::Cancel))));

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert!(f.host.exports().is_empty());
        assert_eq!(std::fs::read_to_string(dir.path().join("bg.png")).unwrap(), "old");
    }

    #[tokio::test]
    async fn recoverable_failure_moves_on() {
        let f = fixture(TraversalMode::Flat).await;
        f.host.fail_action("blur");
        let dir = tempfile::tempdir().unwrap();
        let executor = PipelineExecutor::new(
            registry(),
            vec![layers_only(), Command::action("blur"), Command::action("export")],
            output_in(dir.path(), OverwriteMode::Replace),
        );

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.failed(), 4);
        assert_eq!(report.failed_commands.len(), 4);
        assert!(f.host.exports().is_empty());
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn fatal_failure_aborts() {
        let f = fixture(TraversalMode::Flat).await;
        f.host.fail_action("blur");
        let dir = tempfile::tempdir().unwrap();
        let executor = PipelineExecutor::new(
            registry(),
            vec![
                layers_only(),
                Command::action("blur").with_policy(FailurePolicy::Fatal),
                Command::action("export"),
            ],
            output_in(dir.path(), OverwriteMode::Replace),
        );

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert!(report.is_aborted());
        assert_eq!(report.items.len(), 2);
        assert!(matches!(
            report.status,
            RunStatus::Aborted { item, .. } if item == f.ids["bg"]
        ));
    }

    #[tokio::test]
    async fn validation_problem_skips_the_item() {
        let f = fixture(TraversalMode::Flat).await;
        let commands = vec![
            layers_only(),
            Command::action("rename").with_placeholder("pattern", Placeholder::CurrentItemName),
            Command::action("rename").with_arg("pattern", "{name"),
        ];
        let executor = PipelineExecutor::new(registry(), commands, OutputOptions::default())
            .with_mode(ExecutionMode::Preview);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.skipped(), 4);
        assert_eq!(report.skipped_commands.len(), 4);
    }

    #[tokio::test]
    async fn preview_defers_image_actions_and_never_exports() {
        let f = fixture(TraversalMode::Flat).await;
        let executor = PipelineExecutor::new(
            registry(),
            vec![
                layers_only(),
                Command::action("blur").with_arg("radius", 2.0),
                Command::action("export"),
            ],
            OutputOptions::default(),
        )
        .with_mode(ExecutionMode::Preview);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        let cat = report.outcome(f.ids["cat"]).unwrap();
        assert_eq!(cat.deferred.len(), 1);
        assert_eq!(cat.deferred[0].args["radius"], 2.0);
        assert!(f.host.applied().is_empty());
        assert!(f.host.exports().is_empty());
    }

    #[tokio::test]
    async fn deferred_actions_refresh_without_a_new_simulation() {
        let f = fixture(TraversalMode::Flat).await;
        let commands = |blur: Command| vec![layers_only(), blur, Command::action("export")];
        let preview = |commands| {
            PipelineExecutor::new(registry(), commands, OutputOptions::default()).with_mode(ExecutionMode::Preview)
        };

        let mut report = preview(commands(Command::action("blur").with_arg("radius", 2.0)))
            .run_enumeration(&f.host, &f.enumeration)
            .await
            .unwrap();
        let names: Vec<_> = report.items.iter().map(|o| o.name.clone()).collect();

        let sharper = preview(commands(Command::action("blur").with_arg("radius", 5.0)));
        assert!(sharper.refresh_deferred(f.enumeration.tree(), &mut report.items).unwrap());
        let cat = report.outcome(f.ids["cat"]).unwrap();
        assert_eq!(cat.deferred.len(), 1);
        assert_eq!(cat.deferred[0].args["radius"], 5.0);
        assert!(report.outcome(f.ids["icons"]).unwrap().deferred.is_empty());
        assert_eq!(report.items.iter().map(|o| o.name.clone()).collect::<Vec<_>>(), names);

        let per_item = preview(commands(
            Command::action("blur").with_placeholder("radius", Placeholder::CurrentItemId),
        ));
        assert!(!per_item.refresh_deferred(f.enumeration.tree(), &mut report.items).unwrap());
        assert_eq!(report.outcome(f.ids["cat"]).unwrap().deferred[0].args["radius"], 5.0);
    }

    #[tokio::test]
    async fn selected_only_commands_and_parent_conditions() {
        let f = fixture(TraversalMode::Hierarchical).await;
        let commands = vec![
            layers_only(),
            Command::condition("name_matches")
                .with_arg("mode", "does_not_start_with")
                .with_arg("text", "ic")
                .apply_to_parents(true),
            Command::action("rename")
                .with_arg("pattern", "sel_{name}")
                .with_scope(Applicability::SelectedOnly),
        ];
        let executor = PipelineExecutor::new(registry(), commands, OutputOptions::default())
            .with_mode(ExecutionMode::Preview)
            .with_selection([f.ids["bg"]].into_iter().collect());

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.outcome(f.ids["bg"]).unwrap().name, "sel_bg");
        assert_eq!(report.outcome(f.ids["title"]).unwrap().name, "title");
        // Enclosing group "icons" fails the condition.
        assert!(matches!(
            report.outcome(f.ids["cat"]).unwrap().status,
            ItemStatus::Excluded { .. }
        ));
    }

    #[tokio::test]
    async fn rename_counter_is_per_command() {
        let f = fixture(TraversalMode::Flat).await;
        let commands = vec![layers_only(), Command::action("rename").with_arg("pattern", "img_{n:2}")];
        let executor = PipelineExecutor::new(registry(), commands, OutputOptions::default())
            .with_mode(ExecutionMode::Preview);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        let names: Vec<_> = report
            .items
            .iter()
            .filter(|o| o.status == ItemStatus::Processed)
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["img_01", "img_02", "img_03", "img_04"]);
    }

    #[tokio::test]
    async fn cancellation_is_checked_between_items() {
        let f = fixture(TraversalMode::Flat).await;
        let token = CancellationToken::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let progress = {
            let token = token.clone();
            let seen = seen.clone();
            ProgressSender::new(move |_, _| {
                if seen.fetch_add(1, Ordering::SeqCst) == 1 {
                    token.cancel();
                }
            })
        };

        let executor = PipelineExecutor::new(registry(), vec![layers_only()], OutputOptions::default())
            .with_mode(ExecutionMode::Preview)
            .with_cancellation(token)
            .with_progress(progress);

        let report = executor.run_enumeration(&f.host, &f.enumeration).await.unwrap();
        assert_eq!(report.status, RunStatus::Cancelled);
        assert_eq!(report.items.len(), 2);
    }

    #[test]
    fn constant_conditions_are_compiled_once_per_run() {
        let commands = vec![
            Command::condition("name_matches")
                .with_arg("mode", "regex")
                .with_arg("text", "^ca"),
            Command::condition("name_matches")
                .with_arg("mode", "contains")
                .with_placeholder("text", Placeholder::ParentName),
            Command::condition("visible").disabled(),
            Command::action("export"),
        ];
        let executor = PipelineExecutor::new(registry(), commands, OutputOptions::default());

        let planned = executor.plan().unwrap();
        let prepared = executor.prepare_conditions(&planned).unwrap();
        assert!(matches!(prepared[0], Some(CompiledExpr::Pattern(_))));
        assert!(prepared[1].is_none());
        assert!(prepared[2].is_none());
        assert!(prepared[3].is_none());
    }

    #[tokio::test]
    async fn invalid_configuration_is_rejected_up_front() {
        let f = fixture(TraversalMode::Flat).await;
        let executor = PipelineExecutor::new(
            registry(),
            vec![Command::action("export").with_arg("extension", 5)],
            OutputOptions::default(),
        );
        assert!(matches!(
            executor.run_enumeration(&f.host, &f.enumeration).await,
            Err(Error::Validation(_))
        ));
    }
}
