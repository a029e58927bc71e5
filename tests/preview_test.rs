//! Previews against the same host and settings a run would use.

mod common;

use common::TestHarness;
use lf_core::RunMode;
use lf_pipeline::Command;
use lf_preview::{CommandField, RenderOutcome, SettingChange};
use lf_settings::{defaults, SettingValue};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn blur_and_export(radius: f64) -> SettingValue {
    SettingValue::Commands(vec![
        Command::condition("kind").with_arg("kinds", json!(["layer"])),
        Command::action("blur").with_arg("radius", radius),
        Command::action("export"),
    ])
}

#[tokio::test]
async fn preview_matches_the_run_without_side_effects() {
    let h = TestHarness::new();
    let overrides = h
        .overrides()
        .with(defaults::COMMANDS, blur_and_export(2.0))
        .with(defaults::TRAVERSAL, SettingValue::Choice("flat".into()));
    let mut session = h.session(RunMode::Interactive);
    let mut renderer = session.preview_renderer(&overrides).unwrap();

    session
        .preview(&h.host, &overrides, &mut renderer, &CancellationToken::new())
        .await
        .unwrap();

    let previewed: Vec<_> = renderer
        .state()
        .included()
        .map(|e| e.output.clone().unwrap())
        .collect();
    assert_eq!(previewed.len(), 5);
    assert!(h.host.exports().is_empty());
    assert!(h.written_files().is_empty());
    assert_eq!(h.host.live_copies(), 0);
    for id in h.ids_named("cat").await {
        assert!(h.host.history(id).is_empty());
    }
    assert!(!h.settings_path().exists());

    let report = session
        .run(&h.host, &overrides, None, CancellationToken::new())
        .await
        .unwrap();
    let written: Vec<_> = report.outputs().into_iter().cloned().collect();
    assert_eq!(previewed, written);
}

#[tokio::test]
async fn preview_is_bounded_by_the_item_limit() {
    let h = TestHarness::new();
    let overrides = h
        .overrides()
        .with(defaults::PREVIEW_MAX_ITEMS, SettingValue::Int(3));
    let session = h.session(RunMode::NonInteractive);
    let mut renderer = session.preview_renderer(&overrides).unwrap();

    session
        .preview(&h.host, &overrides, &mut renderer, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(renderer.state().entries.len(), 3);
    assert!(renderer.state().truncated);
}

#[tokio::test]
async fn edits_re_render_only_what_they_touch() {
    let h = TestHarness::new();
    let session = h.session(RunMode::NonInteractive);
    let token = CancellationToken::new();
    let first = h.overrides().with(defaults::COMMANDS, blur_and_export(2.0));
    let mut renderer = session.preview_renderer(&first).unwrap();
    session.preview(&h.host, &first, &mut renderer, &token).await.unwrap();

    // Extension only affects names.
    renderer.invalidate(&SettingChange::setting(defaults::FILE_EXTENSION));
    let jpg = first
        .clone()
        .with(defaults::FILE_EXTENSION, SettingValue::String("jpg".into()));
    let outcome = session.preview(&h.host, &jpg, &mut renderer, &token).await.unwrap();
    assert_eq!(
        outcome,
        RenderOutcome::Rendered {
            names_rebuilt: true,
            thumbnails_rendered: 0
        }
    );
    assert!(renderer
        .state()
        .included()
        .all(|e| e.resolved_name.ends_with(".jpg")));

    // A blur radius change re-renders thumbnails.
    renderer.invalidate(&SettingChange::command("blur", CommandField::Arguments));
    let stronger = jpg.clone().with(defaults::COMMANDS, blur_and_export(8.0));
    let outcome = session
        .preview(&h.host, &stronger, &mut renderer, &token)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RenderOutcome::Rendered {
            names_rebuilt: false,
            thumbnails_rendered: 5
        }
    );

    // Nothing changed.
    let outcome = session
        .preview(&h.host, &stronger, &mut renderer, &token)
        .await
        .unwrap();
    assert_eq!(outcome, RenderOutcome::Unchanged);
    assert_eq!(h.host.live_copies(), 0);
}

#[tokio::test]
async fn cancelled_preview_keeps_the_previous_state() {
    let h = TestHarness::new();
    let session = h.session(RunMode::NonInteractive);
    let overrides = h.overrides();
    let mut renderer = session.preview_renderer(&overrides).unwrap();
    session
        .preview(&h.host, &overrides, &mut renderer, &CancellationToken::new())
        .await
        .unwrap();
    let before = renderer.state().clone();

    renderer.invalidate(&SettingChange::Items);
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let outcome = session
        .preview(&h.host, &overrides, &mut renderer, &cancelled)
        .await
        .unwrap();

    assert_eq!(outcome, RenderOutcome::Cancelled);
    assert_eq!(renderer.state(), &before);
    assert!(!renderer.dirty().is_clean());
}
