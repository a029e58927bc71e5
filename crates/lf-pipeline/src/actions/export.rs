//! Export action: choose a unique output path and write the item.

use std::path::PathBuf;

use async_trait::async_trait;
use lf_core::{ArgMap, Error, ItemKind, Result};
use lf_output::naming::{ensure_extension, validate_extension, with_extension};
use lf_output::{sanitize_filename, Resolution};

use crate::action::{Action, ActionResult};
use crate::context::{ActionContext, ItemState};
use crate::registry::ActionEffect;

#[derive(Debug)]
pub struct ExportAction {
    /// Overrides the run's file extension when set.
    extension: Option<String>,
    /// Passed to the host unchanged.
    format: ArgMap,
}

impl ExportAction {
    pub fn new(extension: Option<String>, format: ArgMap) -> Self {
        Self { extension, format }
    }

    /// File name for the item: images get their extension replaced, layers
    /// and groups keep their full name and get the extension appended.
    fn file_name(&self, state: &ItemState, default_ext: &str) -> Result<String> {
        let ext = self.extension.as_deref().unwrap_or(default_ext);
        validate_extension(ext)?;
        let name = match state.kind {
            ItemKind::Image => with_extension(&state.name, ext),
            ItemKind::Layer | ItemKind::Group => ensure_extension(&state.name, ext),
        };
        sanitize_filename(&name)
    }

    fn folder(&self, state: &ItemState, ctx: &ActionContext<'_>) -> Result<PathBuf> {
        let mut folder = ctx.output.directory.clone();
        for segment in &state.folder {
            folder.push(sanitize_filename(segment)?);
        }
        Ok(folder)
    }
}

#[async_trait]
impl Action for ExportAction {
    fn name(&self) -> &'static str {
        "Export"
    }

    fn effect(&self) -> ActionEffect {
        ActionEffect::Export
    }

    async fn execute(&self, state: &mut ItemState, ctx: &mut ActionContext<'_>) -> Result<ActionResult> {
        let file_name = self.file_name(state, &ctx.output.file_extension)?;
        let folder = self.folder(state, ctx)?;

        if ctx.is_preview() {
            let candidate = folder.join(ctx.uniquifier.claim(&folder, &file_name));
            let summary = format!("Would export to {}", candidate.display());
            state.output = Some(candidate);
            return Ok(ActionResult::done(summary));
        }

        let resolver = ctx
            .resolver
            .as_deref_mut()
            .ok_or_else(|| Error::Internal("export in run mode without an overwrite resolver".into()))?;
        let candidate = folder.join(ctx.uniquifier.candidate(&folder, &file_name));

        match resolver.resolve(&folder, &file_name, ctx.uniquifier).await? {
            Resolution::Write(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| Error::from_io(parent, e))?;
                }
                ctx.host.export(state.working_item, &path, &self.format).await?;
                tracing::debug!("Exported {} to {}", state.item_id, path.display());
                let summary = format!("Exported to {}", path.display());
                state.output = Some(path);
                Ok(ActionResult::done(summary))
            }
            Resolution::Skip => Ok(ActionResult::skipped(format!(
                "{} already exists",
                candidate.display()
            ))),
            Resolution::Cancel => Ok(ActionResult::cancel_run(format!(
                "Cancelled at existing {}",
                candidate.display()
            ))),
        }
    }
}
