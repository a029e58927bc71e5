//! JSON description of a host's item tree and procedures.
//!
//! The CLI drives a [`MemoryHost`] built from a manifest, so a batch can be
//! configured, previewed and run without an image editor attached.
//!
//! ```json
//! {
//!   "items": [
//!     { "name": "poster.xcf", "kind": "image", "children": [
//!       { "name": "bg", "kind": "layer" },
//!       { "name": "icons", "kind": "group", "children": [ { "name": "cat", "kind": "layer" } ] }
//!     ] }
//!   ],
//!   "procedures": [ { "name": "blur", "args": [ { "name": "radius", "type": "float" } ] } ]
//! }
//! ```

use std::path::Path;

use lf_core::{Error, ItemId, ItemKind, Result};
use lf_items::MemoryHost;
use lf_pipeline::{ArgSpec, CommandRegistry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<ManifestItem>,
    #[serde(default)]
    pub procedures: Vec<ManifestProcedure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestItem {
    pub name: String,
    pub kind: ItemKind,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ManifestItem>,
}

fn default_visible() -> bool {
    true
}

/// A host procedure usable as an image action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestProcedure {
    pub name: String,
    #[serde(default)]
    pub args: Vec<ArgSpec>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(json).map_err(|e| Error::Validation(format!("manifest parse error: {e}")))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::from_io(path, e))?;
        Self::from_json(&contents)
    }

    /// Layers cannot have children.
    pub fn validate(&self) -> Result<()> {
        fn check(item: &ManifestItem) -> Result<()> {
            if !item.kind.is_container() && !item.children.is_empty() {
                return Err(Error::Validation(format!(
                    "{} {:?} cannot have children",
                    item.kind, item.name
                )));
            }
            item.children.iter().try_for_each(check)
        }
        self.items.iter().try_for_each(check)
    }

    /// A host holding the manifest's items.
    pub fn build_host(&self, write_files: bool) -> MemoryHost {
        let host = MemoryHost::new().with_file_output(write_files);
        for item in &self.items {
            let id = host.add_root(&item.name, item.kind);
            populate(&host, id, item);
        }
        host
    }

    /// Built-in commands plus the manifest's procedures.
    pub fn registry(&self) -> Result<CommandRegistry> {
        let mut registry = CommandRegistry::builtin();
        for procedure in &self.procedures {
            registry.register_host_procedure(&procedure.name, procedure.args.clone())?;
        }
        Ok(registry)
    }

    pub fn item_count(&self) -> usize {
        fn count(items: &[ManifestItem]) -> usize {
            items.iter().map(|i| 1 + count(&i.children)).sum()
        }
        count(&self.items)
    }
}

fn populate(host: &MemoryHost, id: ItemId, item: &ManifestItem) {
    if !item.visible {
        host.set_visible(id, false);
    }
    for child in &item.children {
        let child_id = host.add_child(id, &child.name, child.kind);
        populate(host, child_id, child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lf_items::{Host, ItemTree};

    const SAMPLE: &str = r#"{
        "items": [
            { "name": "poster.xcf", "kind": "image", "children": [
                { "name": "bg", "kind": "layer", "visible": false },
                { "name": "icons", "kind": "group", "children": [
                    { "name": "cat", "kind": "layer" }
                ] }
            ] }
        ],
        "procedures": [ { "name": "blur", "args": [ { "name": "radius", "type": "float" } ] } ]
    }"#;

    #[tokio::test]
    async fn builds_host_tree() {
        let manifest = Manifest::from_json(SAMPLE).unwrap();
        assert_eq!(manifest.item_count(), 4);

        let host = manifest.build_host(false);
        let tree = ItemTree::load(&host, None).await.unwrap();
        assert_eq!(tree.len(), 4);

        let roots = host.list_children(None).await.unwrap();
        let children = host.list_children(Some(roots[0])).await.unwrap();
        let bg = host.get_metadata(children[0]).await.unwrap();
        assert_eq!(bg.name, "bg");
        assert!(!bg.visible);
    }

    #[test]
    fn registers_procedures() {
        let registry = Manifest::from_json(SAMPLE).unwrap().registry().unwrap();
        assert!(registry.get("blur").is_some());
        assert!(registry.get("rename").is_some());
    }

    #[test]
    fn layers_cannot_nest() {
        let json = r#"{"items": [{"name": "a", "kind": "layer", "children": [{"name": "b", "kind": "layer"}]}]}"#;
        assert!(matches!(Manifest::from_json(json), Err(Error::Validation(_))));
    }
}
