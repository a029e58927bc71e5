//! Overwrite resolution for output paths that already exist on disk.
//!
//! [`OverwriteResolver::resolve`] is the only place that looks at existing
//! files. In `ask` mode the decision is delegated to an [`OverwriteDecider`];
//! [`decision_channel`] turns that into an explicit request/response pair so
//! a UI can answer from another task.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use lf_core::{Error, OverwriteMode, Result, RunMode};
use tokio::sync::{mpsc, oneshot};

use crate::uniquify::Uniquifier;

/// Outcome of resolving one candidate path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Write the item to this path.
    Write(PathBuf),
    /// Leave the existing file alone and do not write this item.
    Skip,
    /// Stop the whole run.
    Cancel,
}

/// An answer to an overwrite question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverwriteDecision {
    pub mode: OverwriteMode,
    /// Reuse this answer for every later conflict in the run.
    pub apply_to_all: bool,
}

impl OverwriteDecision {
    pub fn once(mode: OverwriteMode) -> Self {
        Self {
            mode,
            apply_to_all: false,
        }
    }

    pub fn for_all(mode: OverwriteMode) -> Self {
        Self {
            mode,
            apply_to_all: true,
        }
    }
}

/// Answers overwrite questions in `ask` mode.
#[async_trait]
pub trait OverwriteDecider: Send + Sync {
    async fn decide(&self, existing: &Path) -> OverwriteDecision;
}

/// A decider that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecider(pub OverwriteDecision);

#[async_trait]
impl OverwriteDecider for FixedDecider {
    async fn decide(&self, _existing: &Path) -> OverwriteDecision {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Channel-backed decider
// ---------------------------------------------------------------------------

/// A conflict waiting for an answer from outside the executor.
#[derive(Debug)]
pub struct PendingDecision {
    path: PathBuf,
    reply: oneshot::Sender<OverwriteDecision>,
}

impl PendingDecision {
    /// The existing file the question is about.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resume the run with `decision`.
    pub fn answer(self, decision: OverwriteDecision) {
        if self.reply.send(decision).is_err() {
            tracing::debug!("Overwrite answer for {} arrived after the run ended", self.path.display());
        }
    }
}

/// Sends each question over a channel and waits for its reply.
///
/// If the receiving side goes away, the pending question resolves to
/// [`OverwriteMode::Cancel`].
#[derive(Debug, Clone)]
pub struct ChannelDecider {
    tx: mpsc::Sender<PendingDecision>,
}

#[async_trait]
impl OverwriteDecider for ChannelDecider {
    async fn decide(&self, existing: &Path) -> OverwriteDecision {
        let (reply, response) = oneshot::channel();
        let pending = PendingDecision {
            path: existing.to_path_buf(),
            reply,
        };
        if self.tx.send(pending).await.is_err() {
            return OverwriteDecision::for_all(OverwriteMode::Cancel);
        }
        response
            .await
            .unwrap_or(OverwriteDecision::for_all(OverwriteMode::Cancel))
    }
}

/// Create a [`ChannelDecider`] and the receiver its questions arrive on.
pub fn decision_channel(buffer: usize) -> (ChannelDecider, mpsc::Receiver<PendingDecision>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (ChannelDecider { tx }, rx)
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Applies an [`OverwriteMode`] to candidate output paths for one run.
pub struct OverwriteResolver {
    mode: OverwriteMode,
    decider: Option<Arc<dyn OverwriteDecider>>,
    sticky: Option<OverwriteMode>,
}

impl std::fmt::Debug for OverwriteResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverwriteResolver")
            .field("mode", &self.mode)
            .field("sticky", &self.sticky)
            .field("has_decider", &self.decider.is_some())
            .finish_non_exhaustive()
    }
}

impl OverwriteResolver {
    /// Create a resolver. `ask` outside an interactive run is rejected.
    pub fn new(mode: OverwriteMode, run_mode: RunMode) -> Result<Self> {
        if mode == OverwriteMode::Ask && !run_mode.allows_ask() {
            return Err(Error::ConflictResolution(format!(
                "overwrite mode ask cannot be used in a {run_mode} run"
            )));
        }
        Ok(Self {
            mode,
            decider: None,
            sticky: None,
        })
    }

    /// Builder: attach the decider consulted in `ask` mode.
    pub fn with_decider(mut self, decider: Arc<dyn OverwriteDecider>) -> Self {
        self.decider = Some(decider);
        self
    }

    pub fn mode(&self) -> OverwriteMode {
        self.mode
    }

    /// Fail early if `ask` mode has nobody to ask.
    pub fn validate(&self) -> Result<()> {
        if self.mode == OverwriteMode::Ask && self.decider.is_none() {
            return Err(Error::ConflictResolution(
                "overwrite mode ask requires a decider".into(),
            ));
        }
        Ok(())
    }

    /// Decide where (and whether) to write `name` in `folder`.
    ///
    /// `claims` holds the names already written in this run. The candidate
    /// is the name `claims` would grant; rename modes pick the smallest
    /// ` (n)` variant of `name` that is neither claimed nor on disk. A name
    /// is claimed only when the result is a write.
    pub async fn resolve(&mut self, folder: &Path, name: &str, claims: &mut Uniquifier) -> Result<Resolution> {
        let candidate = folder.join(claims.candidate(folder, name));
        if !candidate.exists() {
            return Ok(Resolution::Write(claim(claims, candidate)));
        }

        let mode = match (self.sticky, self.mode) {
            (Some(sticky), _) => sticky,
            (None, OverwriteMode::Ask) => self.ask(&candidate).await?,
            (None, mode) => mode,
        };

        tracing::debug!("{} exists; applying {mode}", candidate.display());

        match mode {
            OverwriteMode::Replace => Ok(Resolution::Write(claim(claims, candidate))),
            OverwriteMode::Skip => Ok(Resolution::Skip),
            OverwriteMode::Cancel => Ok(Resolution::Cancel),
            OverwriteMode::RenameNew => {
                let renamed = free_on_disk(folder, name, claims);
                Ok(Resolution::Write(claim(claims, renamed)))
            }
            OverwriteMode::RenameExisting => {
                let moved_to = free_on_disk(folder, name, claims);
                std::fs::rename(&candidate, &moved_to).map_err(|e| Error::from_io(&candidate, e))?;
                tracing::info!(
                    "Moved existing {} to {}",
                    candidate.display(),
                    moved_to.display()
                );
                claim(claims, moved_to);
                Ok(Resolution::Write(claim(claims, candidate)))
            }
            OverwriteMode::Ask => Err(Error::ConflictResolution(
                "the overwrite decider answered ask".into(),
            )),
        }
    }

    async fn ask(&mut self, candidate: &Path) -> Result<OverwriteMode> {
        let decider = self
            .decider
            .clone()
            .ok_or_else(|| Error::ConflictResolution("overwrite mode ask requires a decider".into()))?;
        let decision = decider.decide(candidate).await;
        if decision.apply_to_all {
            self.sticky = Some(decision.mode);
        }
        Ok(decision.mode)
    }
}

/// Smallest ` (n)` variant of `name` in `folder` that is neither on disk
/// nor already claimed in this run.
fn free_on_disk(folder: &Path, name: &str, claims: &Uniquifier) -> PathBuf {
    folder.join(claims.free_suffix(folder, name, |variant| folder.join(variant).exists()))
}

fn claim(claims: &mut Uniquifier, path: PathBuf) -> PathBuf {
    if let (Some(folder), Some(name)) = (path.parent(), path.file_name()) {
        claims.record(folder, &name.to_string_lossy());
    }
    path
}
