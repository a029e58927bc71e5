//! In-memory [`Host`] implementation.
//!
//! Keeps the whole item tree behind a mutex and records every host call, so
//! tests and the CLI can drive the pipeline without a real image editor.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashSet};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lf_core::{ArgMap, Error, ItemId, ItemKind, ItemMetadata, Result};
use parking_lot::Mutex;

use crate::host::{Host, Thumbnail};

/// One call to [`Host::apply_action`].
#[derive(Debug, Clone, PartialEq)]
pub struct AppliedAction {
    pub item: ItemId,
    pub action_id: String,
    pub args: ArgMap,
}

/// One call to [`Host::export`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRecord {
    pub item: ItemId,
    pub path: PathBuf,
    pub format_args: ArgMap,
}

#[derive(Debug, Clone)]
struct Node {
    meta: ItemMetadata,
    children: Vec<ItemId>,
    history: Vec<String>,
    detached: bool,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<ItemId, Node>,
    roots: Vec<ItemId>,
    next_id: u64,
    applied: Vec<AppliedAction>,
    exports: Vec<ExportRecord>,
    failing: HashSet<String>,
    live_copies: usize,
}

impl State {
    fn insert(&mut self, meta: ItemMetadata, detached: bool, history: Vec<String>) -> ItemId {
        self.next_id += 1;
        let id = ItemId::new(self.next_id);
        self.nodes.insert(
            id,
            Node {
                meta,
                children: Vec::new(),
                history,
                detached,
            },
        );
        id
    }

    fn node(&self, id: ItemId) -> Result<&Node> {
        self.nodes.get(&id).ok_or_else(|| Error::not_found("item", id))
    }
}

/// A thread-safe host backed by plain data structures.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<State>,
    write_files: bool,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: make [`Host::export`] write a small file at the target path.
    pub fn with_file_output(mut self, write_files: bool) -> Self {
        self.write_files = write_files;
        self
    }

    /// Append a top-level item.
    pub fn add_root(&self, name: impl Into<String>, kind: ItemKind) -> ItemId {
        let mut state = self.state.lock();
        let id = state.insert(ItemMetadata::new(name, kind), false, Vec::new());
        state.roots.push(id);
        id
    }

    /// Append a child to `parent`. An unknown parent leaves the item orphaned.
    pub fn add_child(&self, parent: ItemId, name: impl Into<String>, kind: ItemKind) -> ItemId {
        let mut state = self.state.lock();
        let id = state.insert(ItemMetadata::new(name, kind), false, Vec::new());
        if let Some(node) = state.nodes.get_mut(&parent) {
            node.children.push(id);
        }
        id
    }

    pub fn set_visible(&self, id: ItemId, visible: bool) {
        if let Some(node) = self.state.lock().nodes.get_mut(&id) {
            node.meta.visible = visible;
        }
    }

    pub fn rename(&self, id: ItemId, name: impl Into<String>) {
        if let Some(node) = self.state.lock().nodes.get_mut(&id) {
            node.meta.name = name.into();
        }
    }

    /// Make every future call of `action_id` fail.
    pub fn fail_action(&self, action_id: impl Into<String>) {
        self.state.lock().failing.insert(action_id.into());
    }

    pub fn applied(&self) -> Vec<AppliedAction> {
        self.state.lock().applied.clone()
    }

    pub fn exports(&self) -> Vec<ExportRecord> {
        self.state.lock().exports.clone()
    }

    /// Procedures applied to `id`, oldest first.
    pub fn history(&self, id: ItemId) -> Vec<String> {
        self.state
            .lock()
            .nodes
            .get(&id)
            .map(|node| node.history.clone())
            .unwrap_or_default()
    }

    /// Copies created by [`Host::duplicate`] and not yet discarded.
    pub fn live_copies(&self) -> usize {
        self.state.lock().live_copies
    }
}

#[async_trait]
impl Host for MemoryHost {
    async fn list_children(&self, parent: Option<ItemId>) -> Result<Vec<ItemId>> {
        let state = self.state.lock();
        match parent {
            None => Ok(state.roots.clone()),
            Some(id) => Ok(state.node(id)?.children.clone()),
        }
    }

    async fn get_metadata(&self, item: ItemId) -> Result<ItemMetadata> {
        Ok(self.state.lock().node(item)?.meta.clone())
    }

    async fn apply_action(&self, item: ItemId, action_id: &str, args: &ArgMap) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing.contains(action_id) {
            return Err(Error::host(format!("procedure {action_id} failed on {item}")));
        }
        let node = state
            .nodes
            .get_mut(&item)
            .ok_or_else(|| Error::not_found("item", item))?;
        node.history.push(action_id.to_string());
        state.applied.push(AppliedAction {
            item,
            action_id: action_id.to_string(),
            args: args.clone(),
        });
        Ok(())
    }

    async fn export(&self, item: ItemId, path: &Path, format_args: &ArgMap) -> Result<()> {
        let mut state = self.state.lock();
        let node = state.node(item)?;
        let contents = format!("{}\n{}\n", node.meta.name, node.history.join("\n"));

        if self.write_files {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir).map_err(|e| Error::from_io(dir, e))?;
            }
            std::fs::write(path, contents).map_err(|e| Error::from_io(path, e))?;
        }

        state.exports.push(ExportRecord {
            item,
            path: path.to_path_buf(),
            format_args: format_args.clone(),
        });
        Ok(())
    }

    async fn duplicate(&self, item: ItemId) -> Result<ItemId> {
        let mut state = self.state.lock();
        let node = state.node(item)?.clone();
        let id = state.insert(node.meta, true, node.history);
        state.live_copies += 1;
        Ok(id)
    }

    async fn discard(&self, item: ItemId) -> Result<()> {
        let mut state = self.state.lock();
        if !state.node(item)?.detached {
            return Err(Error::Validation(format!(
                "{item} is an original item and cannot be discarded"
            )));
        }
        state.nodes.remove(&item);
        state.live_copies = state.live_copies.saturating_sub(1);
        Ok(())
    }

    async fn thumbnail(&self, item: ItemId, max_size: u32) -> Result<Thumbnail> {
        if max_size == 0 {
            return Err(Error::Validation("thumbnail size must be positive".into()));
        }
        let state = self.state.lock();
        let node = state.node(item)?;

        // Colour derived from the applied procedures, so thumbnails differ
        // exactly when the pixel-affecting history differs.
        let mut hasher = DefaultHasher::new();
        node.history.hash(&mut hasher);
        let [r, g, b, ..] = hasher.finish().to_le_bytes();

        let side = max_size.min(2);
        let rgba = [r, g, b, 255].repeat((side * side) as usize);
        Ok(Thumbnail {
            width: side,
            height: side,
            rgba,
        })
    }
}
