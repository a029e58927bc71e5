//! Indexed snapshot of the host's item tree.
//!
//! Items are stored in a map keyed by [`ItemId`]; each item records its
//! parent and ordered children, so parent lookups and child iteration never
//! chase references.

use std::collections::{HashMap, HashSet};

use lf_core::{Error, ItemId, ItemKind, Result, TraversalMode};

use crate::host::Host;
use crate::traverse::{Scope, Traversal};

/// One node of an [`ItemTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub parent: Option<ItemId>,
    pub children: Vec<ItemId>,
    /// Zero for top-level items.
    pub depth: usize,
    pub name: String,
    pub kind: ItemKind,
    pub visible: bool,
}

impl Item {
    pub fn is_top_level(&self) -> bool {
        self.depth == 0
    }
}

/// A snapshot of the host tree taken at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ItemTree {
    items: HashMap<ItemId, Item>,
    roots: Vec<ItemId>,
}

impl ItemTree {
    /// Read the host tree depth-first.
    ///
    /// Items deeper than `max_depth` (zero = top level only) are not read.
    /// An item reachable twice is reported as a [`Error::Validation`].
    pub async fn load(host: &dyn Host, max_depth: Option<usize>) -> Result<Self> {
        let roots = host.list_children(None).await?;
        let mut items = HashMap::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<(ItemId, Option<ItemId>, usize)> =
            roots.iter().rev().map(|id| (*id, None, 0)).collect();

        while let Some((id, parent, depth)) = stack.pop() {
            if !seen.insert(id) {
                return Err(Error::Validation(format!(
                    "item {id} is reachable more than once; the host tree is not a tree"
                )));
            }

            let meta = host.get_metadata(id).await?;
            let descend = meta.kind.is_container() && max_depth.map_or(true, |max| depth < max);
            let children = if descend {
                host.list_children(Some(id)).await?
            } else {
                Vec::new()
            };

            for child in children.iter().rev() {
                stack.push((*child, Some(id), depth + 1));
            }

            items.insert(
                id,
                Item {
                    id,
                    parent,
                    children,
                    depth,
                    name: meta.name,
                    kind: meta.kind,
                    visible: meta.visible,
                },
            );
        }

        tracing::debug!("Loaded item tree with {} items", items.len());
        Ok(Self { items, roots })
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    pub fn roots(&self) -> &[ItemId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ancestors of `id`, top-level first. Empty for unknown or top-level items.
    pub fn parents(&self, id: ItemId) -> Vec<&Item> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|item| item.parent);
        while let Some(parent_id) = current {
            let Some(parent) = self.get(parent_id) else {
                break;
            };
            chain.push(parent);
            current = parent.parent;
        }
        chain.reverse();
        chain
    }

    /// Names of the enclosing groups of `id`, outermost first.
    pub fn folder_path(&self, id: ItemId) -> Vec<String> {
        self.parents(id)
            .into_iter()
            .filter(|parent| parent.kind == ItemKind::Group)
            .map(|parent| parent.name.clone())
            .collect()
    }

    /// Lazy depth-first pre-order iteration over the items in `scope`.
    pub fn iter<'a>(&'a self, mode: TraversalMode, scope: &'a Scope) -> Traversal<'a> {
        Traversal::new(self, mode, scope)
    }

    /// Whether `id` or one of its ancestors is in `selected`.
    pub fn is_within(&self, id: ItemId, selected: &std::collections::BTreeSet<ItemId>) -> bool {
        if selected.contains(&id) {
            return true;
        }
        self.parents(id).iter().any(|parent| selected.contains(&parent.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    #[tokio::test]
    async fn load_records_parents_and_depth() {
        let host = MemoryHost::new();
        let image = host.add_root("poster.xcf", ItemKind::Image);
        let group = host.add_child(image, "icons", ItemKind::Group);
        let layer = host.add_child(group, "cat", ItemKind::Layer);

        let tree = ItemTree::load(&host, None).await.unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.roots(), &[image]);

        let cat = tree.get(layer).unwrap();
        assert_eq!(cat.parent, Some(group));
        assert_eq!(cat.depth, 2);
        assert!(tree.get(image).unwrap().is_top_level());

        let chain: Vec<_> = tree.parents(layer).iter().map(|p| p.id).collect();
        assert_eq!(chain, vec![image, group]);
        assert_eq!(tree.folder_path(layer), vec!["icons".to_string()]);
    }

    #[tokio::test]
    async fn max_depth_limits_reading() {
        let host = MemoryHost::new();
        let group = host.add_root("outer", ItemKind::Group);
        let inner = host.add_child(group, "inner", ItemKind::Group);
        host.add_child(inner, "deep", ItemKind::Layer);

        let tree = ItemTree::load(&host, Some(1)).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree.get(inner).unwrap().children.is_empty());
    }

    #[tokio::test]
    async fn empty_host_gives_empty_tree() {
        let host = MemoryHost::new();
        let tree = ItemTree::load(&host, None).await.unwrap();
        assert!(tree.is_empty());
        assert!(tree.parents(ItemId::new(99)).is_empty());
    }
}
