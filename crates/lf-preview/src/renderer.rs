//! Incremental, cancellable preview rendering.
//!
//! A render has two passes over the first `max_items` items of the
//! traversal:
//!
//! 1. **Simulation** -- the pipeline in [`ExecutionMode::Preview`]: inclusion,
//!    resolved names and the image actions each item would receive.
//! 2. **Thumbnails** -- for each included item, the deferred image actions
//!    are replayed on a disposable copy from [`Host::duplicate`]. Results are
//!    cached per item under a fingerprint of those actions, so only items
//!    whose image actions changed are rendered again.
//!
//! When only image commands changed, the previous simulation is kept and
//! just its deferred actions are refreshed from the new command list.
//!
//! Nothing is committed until both passes finish. A cancelled or failed
//! render leaves the previous [`PreviewState`] and the dirty flags alone.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use lf_core::{ItemId, Result};
use lf_items::{Host, ItemTree, Scope, Thumbnail};
use lf_pipeline::{
    CommandRegistry, DeferredAction, ExecutionMode, ItemOutcome, PipelineExecutor, RunStatus,
};
use tokio_util::sync::CancellationToken;

use crate::invalidate::{Invalidation, SettingChange};
use crate::state::{PreviewEntry, PreviewInput, PreviewOptions, PreviewState};

/// Result of [`PreviewRenderer::render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Rendered {
        names_rebuilt: bool,
        /// Thumbnails rendered on the host; cache hits are not counted.
        thumbnails_rendered: usize,
    },
    /// Nothing was dirty.
    Unchanged,
    /// The token fired; the previous state is still current.
    Cancelled,
}

#[derive(Debug, Clone)]
struct CachedThumbnail {
    fingerprint: u64,
    result: std::result::Result<Thumbnail, String>,
}

#[derive(Debug, Clone)]
struct Simulation {
    outcomes: Vec<ItemOutcome>,
    truncated: bool,
}

/// Keeps the current preview and rebuilds the parts a change makes stale.
pub struct PreviewRenderer {
    registry: Arc<CommandRegistry>,
    options: PreviewOptions,
    state: PreviewState,
    dirty: Invalidation,
    /// Outcomes behind `state`.
    simulation: Option<Simulation>,
    thumbnails: HashMap<ItemId, CachedThumbnail>,
}

impl PreviewRenderer {
    pub fn new(registry: Arc<CommandRegistry>, options: PreviewOptions) -> Self {
        Self {
            registry,
            options,
            state: PreviewState::default(),
            dirty: Invalidation::ALL,
            simulation: None,
            thumbnails: HashMap::new(),
        }
    }

    /// The last completed preview.
    pub fn state(&self) -> &PreviewState {
        &self.state
    }

    pub fn options(&self) -> PreviewOptions {
        self.options
    }

    /// What the next render has to rebuild.
    pub fn dirty(&self) -> Invalidation {
        self.dirty
    }

    /// Mark the passes affected by `change` as stale. Returns the scope of
    /// the change itself.
    pub fn invalidate(&mut self, change: &SettingChange) -> Invalidation {
        let scope = change.scope(&self.registry);
        if matches!(change, SettingChange::Items) {
            // Pixel data of the originals may differ now.
            self.thumbnails.clear();
        }
        tracing::debug!("Preview change {change:?} invalidates {scope:?}");
        self.dirty = self.dirty | scope;
        scope
    }

    /// Replace the preview limits. Everything is stale afterwards.
    pub fn set_options(&mut self, options: PreviewOptions) {
        if options == self.options {
            return;
        }
        if options.thumbnail_size != self.options.thumbnail_size {
            self.thumbnails.clear();
        }
        self.options = options;
        self.dirty = Invalidation::ALL;
    }

    /// Bring the preview up to date with `input`.
    ///
    /// `tree` should be a fresh snapshot of the host; `cancel` is checked
    /// between items in both passes.
    ///
    /// # Errors
    ///
    /// Returns the executor's error when the command list is invalid. The
    /// previous state is kept.
    pub async fn render(
        &mut self,
        host: &dyn Host,
        tree: &ItemTree,
        input: &PreviewInput,
        cancel: &CancellationToken,
    ) -> Result<RenderOutcome> {
        if self.dirty.is_clean() {
            return Ok(RenderOutcome::Unchanged);
        }

        let refreshed = if self.dirty.names {
            None
        } else {
            self.refreshed_simulation(tree, input)?
        };
        let names_rebuilt = refreshed.is_none();
        let simulation = match refreshed {
            Some(simulation) => simulation,
            None => match self.simulate(host, tree, input, cancel).await? {
                Some(simulation) => simulation,
                None => {
                    tracing::debug!("Preview cancelled during simulation");
                    return Ok(RenderOutcome::Cancelled);
                }
            },
        };
        let Some((cache, rendered)) = self.render_thumbnails(host, &simulation.outcomes, cancel).await else {
            tracing::debug!("Preview cancelled during thumbnails");
            return Ok(RenderOutcome::Cancelled);
        };

        let entries = simulation
            .outcomes
            .iter()
            .map(|outcome| {
                let cached = cache.get(&outcome.item_id);
                let mut entry =
                    PreviewEntry::from_outcome(outcome, cached.and_then(|c| c.result.as_ref().ok().cloned()));
                if let Some(Err(e)) = cached.map(|c| &c.result) {
                    entry.error.get_or_insert_with(|| format!("thumbnail: {e}"));
                }
                entry
            })
            .collect();

        self.state = PreviewState {
            revision: self.state.revision + 1,
            entries,
            truncated: simulation.truncated,
        };
        self.simulation = Some(simulation);
        self.thumbnails = cache;
        self.dirty = Invalidation::NONE;

        tracing::info!(
            "Preview revision {}: {} item(s), {rendered} thumbnail(s) rendered",
            self.state.revision,
            self.state.entries.len()
        );
        Ok(RenderOutcome::Rendered {
            names_rebuilt,
            thumbnails_rendered: rendered,
        })
    }

    fn executor(&self, input: &PreviewInput) -> PipelineExecutor {
        PipelineExecutor::new(
            Arc::clone(&self.registry),
            input.commands.clone(),
            input.output.clone(),
        )
        .with_mode(ExecutionMode::Preview)
        .with_selection(input.selected.clone())
    }

    /// The previous simulation with its deferred actions taken from
    /// `input`, or `None` when it has to be simulated again.
    fn refreshed_simulation(&self, tree: &ItemTree, input: &PreviewInput) -> Result<Option<Simulation>> {
        let Some(last) = &self.simulation else {
            return Ok(None);
        };
        let mut simulation = last.clone();
        if self.executor(input).refresh_deferred(tree, &mut simulation.outcomes)? {
            tracing::debug!("Preview keeps names, refreshed {} item(s)", simulation.outcomes.len());
            Ok(Some(simulation))
        } else {
            Ok(None)
        }
    }

    async fn simulate(
        &self,
        host: &dyn Host,
        tree: &ItemTree,
        input: &PreviewInput,
        cancel: &CancellationToken,
    ) -> Result<Option<Simulation>> {
        let scope = Scope::from_selection(input.selected.clone());
        let total = tree.iter(input.output.traversal, &scope).count();
        let sample = tree
            .iter(input.output.traversal, &scope)
            .take(self.options.max_items);

        let executor = self.executor(input).with_cancellation(cancel.clone());
        let report = executor.run(host, tree, sample).await?;
        if report.status == RunStatus::Cancelled {
            return Ok(None);
        }
        Ok(Some(Simulation {
            outcomes: report.items,
            truncated: total > self.options.max_items,
        }))
    }

    /// Returns the new cache and how many thumbnails were rendered, or
    /// `None` when cancelled.
    async fn render_thumbnails(
        &self,
        host: &dyn Host,
        outcomes: &[ItemOutcome],
        cancel: &CancellationToken,
    ) -> Option<(HashMap<ItemId, CachedThumbnail>, usize)> {
        let mut cache = HashMap::new();
        if self.options.thumbnail_size == 0 {
            return Some((cache, 0));
        }

        let mut rendered = 0;
        for outcome in outcomes.iter().filter(|o| o.is_included()) {
            if cancel.is_cancelled() {
                return None;
            }
            let fingerprint = fingerprint(&outcome.deferred);
            let entry = match self.thumbnails.get(&outcome.item_id) {
                Some(hit) if hit.fingerprint == fingerprint => hit.clone(),
                _ => {
                    rendered += 1;
                    let result = render_copy(host, outcome.item_id, &outcome.deferred, self.options.thumbnail_size)
                        .await
                        .map_err(|e| e.to_string());
                    if let Err(e) = &result {
                        tracing::warn!("No thumbnail for {}: {e}", outcome.original_name);
                    }
                    CachedThumbnail { fingerprint, result }
                }
            };
            cache.insert(outcome.item_id, entry);
        }
        Some((cache, rendered))
    }
}

/// Replay `deferred` on a copy of `item` and render it. The copy is always
/// discarded.
async fn render_copy(host: &dyn Host, item: ItemId, deferred: &[DeferredAction], size: u32) -> Result<Thumbnail> {
    let copy = host.duplicate(item).await?;
    let result = replay(host, copy, deferred, size).await;
    if let Err(e) = host.discard(copy).await {
        tracing::warn!("Failed to discard preview copy {copy}: {e}");
    }
    result
}

async fn replay(host: &dyn Host, copy: ItemId, deferred: &[DeferredAction], size: u32) -> Result<Thumbnail> {
    for action in deferred {
        host.apply_action(copy, &action.procedure, &action.args).await?;
    }
    host.thumbnail(copy, size).await
}

/// Identity of the pixel-affecting work; the commands' ids do not matter.
fn fingerprint(deferred: &[DeferredAction]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for action in deferred {
        action.procedure.hash(&mut hasher);
        for (name, value) in &action.args {
            name.hash(&mut hasher);
            value.to_string().hash(&mut hasher);
        }
    }
    hasher.finish()
}
