//! A batch session: settings loaded for a run mode, then runs and previews.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use lf_core::config::Config;
use lf_core::{Error, Result, RunMode};
use lf_items::{Host, ItemTree, Scope, Traverser};
use lf_output::OverwriteDecider;
use lf_pipeline::{CommandRegistry, ExecutionReport, PipelineExecutor, ProgressSender};
use lf_preview::{PreviewInput, PreviewOptions, PreviewRenderer, RenderOutcome};
use lf_settings::{LoadReport, Overrides, ResolvedSettings, SettingsRegistry};
use tokio_util::sync::CancellationToken;

type ProgressFn = Arc<dyn Fn(f32, &str) + Send + Sync>;

/// Ties the settings registry to the pipeline for one run mode.
///
/// | run mode               | loads settings | saves settings | overrides   |
/// |------------------------|----------------|----------------|-------------|
/// | `interactive`          | yes            | yes            | kept, saved |
/// | `non_interactive`      | no             | no             | this run    |
/// | `run_with_last_values` | yes            | no             | this run    |
pub struct BatchSession {
    run_mode: RunMode,
    settings_path: PathBuf,
    settings: SettingsRegistry,
    commands: Arc<CommandRegistry>,
    load_report: Option<LoadReport>,
    save_error: Option<Error>,
    progress: Option<ProgressFn>,
}

impl BatchSession {
    /// Create a session, loading `settings_path` when the run mode reads
    /// persisted settings.
    pub fn open(
        run_mode: RunMode,
        settings_path: impl Into<PathBuf>,
        commands: Arc<CommandRegistry>,
        config: &Config,
    ) -> Self {
        let settings_path = settings_path.into();
        let mut settings = SettingsRegistry::with_defaults(config);
        let load_report = run_mode.loads_settings().then(|| settings.load(&settings_path));

        tracing::info!(
            "Opened {run_mode} session (settings: {})",
            if load_report.is_some() {
                settings_path.display().to_string()
            } else {
                "defaults".to_string()
            }
        );

        Self {
            run_mode,
            settings_path,
            settings,
            commands,
            load_report,
            save_error: None,
            progress: None,
        }
    }

    /// Builder: report per-item progress of every run.
    pub fn with_progress(mut self, progress: impl Fn(f32, &str) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn settings(&self) -> &SettingsRegistry {
        &self.settings
    }

    /// In-session edits. Only interactive sessions persist them.
    pub fn settings_mut(&mut self) -> &mut SettingsRegistry {
        &mut self.settings
    }

    /// `None` when the run mode does not load settings.
    pub fn load_report(&self) -> Option<&LoadReport> {
        self.load_report.as_ref()
    }

    /// Why the settings were not saved after the last run, if saving failed.
    pub fn save_error(&self) -> Option<&Error> {
        self.save_error.as_ref()
    }

    pub fn command_registry(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    /// Effective settings for a run with `overrides`, without changing the
    /// session.
    pub fn resolve(&self, overrides: &Overrides) -> Result<ResolvedSettings> {
        self.settings.resolve(overrides)
    }

    /// Run the batch over a fresh snapshot of the host.
    ///
    /// In an interactive session the overrides become session edits and the
    /// settings are saved afterwards, unless the run aborted. A failed save
    /// does not fail the run; it is kept in [`save_error`](Self::save_error).
    ///
    /// # Errors
    ///
    /// Invalid overrides, commands or overwrite settings are reported before
    /// any item is processed. Failures during the run are recorded in the
    /// returned report instead.
    pub async fn run(
        &mut self,
        host: &dyn Host,
        overrides: &Overrides,
        decider: Option<Arc<dyn OverwriteDecider>>,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport> {
        self.save_error = None;
        let resolved = if self.run_mode.saves_settings() {
            self.settings.apply_overrides(overrides)?;
            self.settings.resolve(&Overrides::new())?
        } else {
            self.settings.resolve(overrides)?
        };
        let output = resolved.output_for(self.run_mode);

        let enumeration = Traverser::new(host)
            .with_max_depth(resolved.max_depth)
            .enumerate(output.traversal, Scope::from_selection(resolved.selected.clone()))
            .await?;

        let mut executor = PipelineExecutor::new(Arc::clone(&self.commands), resolved.commands, output)
            .with_run_mode(self.run_mode)
            .with_selection(resolved.selected)
            .with_cancellation(cancel);
        if let Some(decider) = decider {
            executor = executor.with_decider(decider);
        }
        if let Some(progress) = &self.progress {
            let progress = Arc::clone(progress);
            executor = executor.with_progress(ProgressSender::new(move |p, step| progress(p, step)));
        }

        let report = executor.run_enumeration(host, &enumeration).await?;

        if self.run_mode.saves_settings() {
            if report.is_aborted() {
                tracing::warn!("Run aborted; settings not saved");
            } else if let Err(e) = self.settings.save(&self.settings_path) {
                tracing::warn!("Failed to save settings to {}: {e}", self.settings_path.display());
                self.save_error = Some(e);
            }
        }
        Ok(report)
    }

    /// A renderer sized by the session's preview settings.
    pub fn preview_renderer(&self, overrides: &Overrides) -> Result<PreviewRenderer> {
        let resolved = self.settings.resolve(overrides)?;
        Ok(PreviewRenderer::new(
            Arc::clone(&self.commands),
            PreviewOptions::from(&resolved),
        ))
    }

    /// Bring `renderer` up to date with the current settings and host.
    /// Never changes the settings.
    pub async fn preview(
        &self,
        host: &dyn Host,
        overrides: &Overrides,
        renderer: &mut PreviewRenderer,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome> {
        let resolved = self.settings.resolve(overrides)?;
        renderer.set_options(PreviewOptions::from(&resolved));
        let tree = ItemTree::load(host, resolved.max_depth).await?;
        renderer
            .render(host, &tree, &PreviewInput::from(&resolved), cancel)
            .await
    }
}
