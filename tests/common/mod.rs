//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which owns a temporary directory for settings
//! and outputs, a [`MemoryHost`] built from a manifest, and the command
//! registry with the manifest's procedures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use layerforge::{BatchSession, Manifest};
use lf_core::config::Config;
use lf_core::{ItemId, RunMode};
use lf_items::{Host, MemoryHost};
use lf_pipeline::CommandRegistry;
use lf_settings::{defaults, Overrides, SettingValue};
use tempfile::TempDir;

/// Items used by most tests:
///
/// ```text
/// poster.xcf (image)
///   bg
///   icons/
///     cat
///     _hidden
///   badges/
///     cat
///   title
/// ```
pub const POSTER: &str = r#"{
    "items": [
        { "name": "poster.xcf", "kind": "image", "children": [
            { "name": "bg", "kind": "layer" },
            { "name": "icons", "kind": "group", "children": [
                { "name": "cat", "kind": "layer" },
                { "name": "_hidden", "kind": "layer", "visible": false }
            ] },
            { "name": "badges", "kind": "group", "children": [
                { "name": "cat", "kind": "layer" }
            ] },
            { "name": "title", "kind": "layer" }
        ] }
    ],
    "procedures": [
        { "name": "blur", "args": [ { "name": "radius", "type": "float" } ] }
    ]
}"#;

pub struct TestHarness {
    pub dir: TempDir,
    pub host: MemoryHost,
    pub registry: Arc<CommandRegistry>,
    pub config: Config,
}

impl TestHarness {
    /// Harness over [`POSTER`].
    pub fn new() -> Self {
        Self::with_manifest(POSTER)
    }

    pub fn with_manifest(json: &str) -> Self {
        let manifest = Manifest::from_json(json).expect("invalid test manifest");
        Self {
            dir: tempfile::tempdir().expect("failed to create temp dir"),
            host: manifest.build_host(true),
            registry: Arc::new(manifest.registry().expect("invalid procedures")),
            config: Config::default(),
        }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.path().join("settings.json")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    pub fn output(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.output_dir().join(relative)
    }

    pub fn session(&self, run_mode: RunMode) -> BatchSession {
        BatchSession::open(
            run_mode,
            self.settings_path(),
            Arc::clone(&self.registry),
            &self.config,
        )
    }

    /// Overrides pointing the output into the harness directory.
    pub fn overrides(&self) -> Overrides {
        Overrides::new().with(
            defaults::OUTPUT_DIRECTORY,
            SettingValue::Path(self.output_dir()),
        )
    }

    /// Ids of every item called `name`, in traversal order.
    pub async fn ids_named(&self, name: &str) -> Vec<ItemId> {
        let mut found = Vec::new();
        let mut stack: Vec<ItemId> = self.host.list_children(None).await.unwrap();
        stack.reverse();
        while let Some(id) = stack.pop() {
            if self.host.get_metadata(id).await.unwrap().name == name {
                found.push(id);
            }
            let mut children = self.host.list_children(Some(id)).await.unwrap();
            children.reverse();
            stack.extend(children);
        }
        found
    }

    /// Every file below the output directory, relative to it, sorted.
    pub fn written_files(&self) -> Vec<String> {
        fn walk(base: &Path, dir: &Path, out: &mut Vec<String>) {
            let Ok(entries) = std::fs::read_dir(dir) else {
                return;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    walk(base, &path, out);
                } else if let Ok(rel) = path.strip_prefix(base) {
                    out.push(rel.to_string_lossy().replace('\\', "/"));
                }
            }
        }
        let mut files = Vec::new();
        walk(&self.output_dir(), &self.output_dir(), &mut files);
        files.sort();
        files
    }

    pub fn touch(&self, relative: &str, contents: &str) {
        let path = self.output(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}
