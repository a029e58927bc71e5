//! Lazy, restartable enumeration of items in processing order.

use std::collections::BTreeSet;

use lf_core::{ItemId, ItemKind, Result, TraversalMode};

use crate::host::Host;
use crate::tree::{Item, ItemTree};

/// Which items a run considers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Scope {
    #[default]
    All,
    /// Items in the set and everything nested below them.
    Selected(BTreeSet<ItemId>),
}

impl Scope {
    /// `Selected` when `ids` is non-empty, `All` otherwise.
    pub fn from_selection(ids: BTreeSet<ItemId>) -> Self {
        if ids.is_empty() {
            Scope::All
        } else {
            Scope::Selected(ids)
        }
    }
}

/// An item yielded by a [`Traversal`], with its output folder segments.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    pub item: &'a Item,
    /// Enclosing group names in hierarchical mode; always empty in flat mode.
    pub folder: Vec<String>,
}

/// Depth-first pre-order iterator driven by an explicit stack.
pub struct Traversal<'a> {
    tree: &'a ItemTree,
    mode: TraversalMode,
    scope: &'a Scope,
    stack: Vec<ItemId>,
}

impl<'a> Traversal<'a> {
    pub(crate) fn new(tree: &'a ItemTree, mode: TraversalMode, scope: &'a Scope) -> Self {
        Self {
            tree,
            mode,
            scope,
            stack: tree.roots().iter().rev().copied().collect(),
        }
    }

    fn in_scope(&self, id: ItemId) -> bool {
        match self.scope {
            Scope::All => true,
            Scope::Selected(ids) => self.tree.is_within(id, ids),
        }
    }
}

impl<'a> Iterator for Traversal<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(item) = self.tree.get(id) else {
                continue;
            };
            self.stack.extend(item.children.iter().rev().copied());

            if !self.in_scope(id) {
                continue;
            }

            let folder = match self.mode {
                TraversalMode::Flat => Vec::new(),
                TraversalMode::Hierarchical => self.tree.folder_path(id),
            };
            return Some(Visit { item, folder });
        }
        None
    }
}

/// Takes a fresh snapshot of the host tree for every enumeration.
pub struct Traverser<'h> {
    host: &'h dyn Host,
    max_depth: Option<usize>,
}

impl<'h> Traverser<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self {
            host,
            max_depth: None,
        }
    }

    /// Builder: bound the traversal depth (zero = top level only).
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Read the host tree and prepare an enumeration over `scope`.
    ///
    /// Changes made to the host after this call are not observed by the
    /// returned enumeration; call `enumerate` again to see them.
    pub async fn enumerate(&self, mode: TraversalMode, scope: Scope) -> Result<Enumeration> {
        let tree = ItemTree::load(self.host, self.max_depth).await?;
        Ok(Enumeration { tree, mode, scope })
    }
}

/// A snapshot plus the mode and scope it should be walked with.
#[derive(Debug, Clone)]
pub struct Enumeration {
    tree: ItemTree,
    mode: TraversalMode,
    scope: Scope,
}

impl Enumeration {
    /// Start (or restart) iteration from the first item.
    pub fn iter(&self) -> Traversal<'_> {
        self.tree.iter(self.mode, &self.scope)
    }

    pub fn tree(&self) -> &ItemTree {
        &self.tree
    }

    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Number of items of `kind` in scope.
    pub fn count_kind(&self, kind: ItemKind) -> usize {
        self.iter().filter(|visit| visit.item.kind == kind).count()
    }
}
