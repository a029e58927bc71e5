//! Built-in pipeline actions.
//!
//! Name and export actions only change the item state the executor carries;
//! image actions are delegated to the host as procedures.

mod export;
mod folders;
mod procedure;
mod rename;

pub use export::ExportAction;
pub use folders::RemoveFolderStructureAction;
pub use procedure::HostProcedureAction;
pub use rename::RenameAction;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Action, ActionOutcome};
    use crate::context::{ActionContext, ExecutionMode, ItemState, OutputOptions};
    use lf_core::{ArgMap, CommandId, ItemKind, OverwriteMode, RunMode, TraversalMode};
    use lf_items::{ItemTree, MemoryHost, Scope};
    use lf_output::{OverwriteResolver, Uniquifier};

    async fn fixture() -> (MemoryHost, ItemTree) {
        let host = MemoryHost::new().with_file_output(true);
        let image = host.add_root("poster.xcf", ItemKind::Image);
        let icons = host.add_child(image, "icons", ItemKind::Group);
        host.add_child(icons, "cat", ItemKind::Layer);
        let tree = ItemTree::load(&host, None).await.unwrap();
        (host, tree)
    }

    fn state_for(tree: &ItemTree, name: &str) -> ItemState {
        let scope = Scope::All;
        let visit = tree
            .iter(TraversalMode::Hierarchical, &scope)
            .find(|v| v.item.name == name)
            .unwrap();
        ItemState::new(&visit, false)
    }

    fn context<'a>(
        host: &'a MemoryHost,
        tree: &'a ItemTree,
        output: &'a OutputOptions,
        uniquifier: &'a mut Uniquifier,
        resolver: Option<&'a mut OverwriteResolver>,
        sequence: u64,
    ) -> ActionContext<'a> {
        let mode = if resolver.is_some() {
            ExecutionMode::Run
        } else {
            ExecutionMode::Preview
        };
        ActionContext {
            host,
            tree,
            output,
            uniquifier,
            resolver,
            mode,
            command_id: CommandId::new(),
            sequence,
        }
    }

    #[tokio::test]
    async fn rename_uses_pattern_fields() {
        let (host, tree) = fixture().await;
        let output = OutputOptions::default();
        let mut uniquifier = Uniquifier::new();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, None, 2);

        RenameAction::new("{parent}-{name}-{n:2}")
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();
        assert_eq!(state.name, "icons-cat-02");
        assert_eq!(state.original_name, "cat");
    }

    #[tokio::test]
    async fn rename_to_empty_is_a_validation_error() {
        let (host, tree) = fixture().await;
        let output = OutputOptions::default();
        let mut uniquifier = Uniquifier::new();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, None, 1);

        let err = RenameAction::new("  ").execute(&mut state, &mut ctx).await.unwrap_err();
        assert!(matches!(err, lf_core::Error::Validation(_)));
    }

    #[tokio::test]
    async fn preview_export_computes_path_only() {
        let (host, tree) = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        let output = OutputOptions {
            directory: dir.path().to_path_buf(),
            ..OutputOptions::default()
        };
        let mut uniquifier = Uniquifier::new();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, None, 1);

        ExportAction::new(None, ArgMap::new())
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();
        assert_eq!(state.output, Some(dir.path().join("icons").join("cat.png")));
        assert!(host.exports().is_empty());
    }

    #[tokio::test]
    async fn run_export_writes_and_flattens_after_folder_removal() {
        let (host, tree) = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        let output = OutputOptions {
            directory: dir.path().to_path_buf(),
            ..OutputOptions::default()
        };
        let mut uniquifier = Uniquifier::new();
        let mut resolver =
            OverwriteResolver::new(OverwriteMode::RenameNew, RunMode::NonInteractive).unwrap();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, Some(&mut resolver), 1);

        RemoveFolderStructureAction
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();
        ExportAction::new(Some("jpg".into()), ArgMap::new())
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();

        let target = dir.path().join("cat.jpg");
        assert_eq!(state.output.as_deref(), Some(target.as_path()));
        assert!(target.exists());
        assert_eq!(host.exports().len(), 1);
    }

    #[tokio::test]
    async fn image_items_get_their_extension_replaced() {
        let (host, tree) = fixture().await;
        let output = OutputOptions::default();
        let mut uniquifier = Uniquifier::new();
        let mut state = state_for(&tree, "poster.xcf");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, None, 1);

        ExportAction::new(None, ArgMap::new())
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();
        assert_eq!(
            state.output.unwrap().file_name().unwrap().to_string_lossy(),
            "poster.png"
        );
    }

    #[tokio::test]
    async fn skip_resolution_skips_the_item() {
        let (host, tree) = fixture().await;
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("icons")).unwrap();
        std::fs::write(dir.path().join("icons").join("cat.png"), "old").unwrap();
        let output = OutputOptions {
            directory: dir.path().to_path_buf(),
            ..OutputOptions::default()
        };
        let mut uniquifier = Uniquifier::new();
        let mut resolver = OverwriteResolver::new(OverwriteMode::Skip, RunMode::NonInteractive).unwrap();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, Some(&mut resolver), 1);

        let result = ExportAction::new(None, ArgMap::new())
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();
        assert!(matches!(result.outcome, ActionOutcome::Skipped(_)));
        assert!(host.exports().is_empty());
    }

    #[tokio::test]
    async fn procedures_are_deferred_in_preview() {
        let (host, tree) = fixture().await;
        let output = OutputOptions::default();
        let mut uniquifier = Uniquifier::new();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, None, 1);

        HostProcedureAction::new("blur", ArgMap::new())
            .execute(&mut state, &mut ctx)
            .await
            .unwrap();
        assert_eq!(state.deferred.len(), 1);
        assert_eq!(state.deferred[0].procedure, "blur");
        assert!(host.applied().is_empty());
    }

    #[tokio::test]
    async fn failing_procedure_becomes_an_action_error() {
        let (host, tree) = fixture().await;
        host.fail_action("blur");
        let output = OutputOptions::default();
        let mut uniquifier = Uniquifier::new();
        let mut resolver =
            OverwriteResolver::new(OverwriteMode::Replace, RunMode::NonInteractive).unwrap();
        let mut state = state_for(&tree, "cat");
        let mut ctx = context(&host, &tree, &output, &mut uniquifier, Some(&mut resolver), 1);

        let err = HostProcedureAction::new("blur", ArgMap::new())
            .execute(&mut state, &mut ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, lf_core::Error::Action { .. }));
    }
}
