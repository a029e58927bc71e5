//! The [`Host`] trait: everything layerforge needs from the image editor.
//!
//! Implementations must be safe to share across threads (`Send + Sync`).

use std::path::Path;

use async_trait::async_trait;
use lf_core::{ArgMap, ItemId, ItemMetadata, Result};

/// A small RGBA raster rendered by the host for previews.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// The host application owning the item tree.
#[async_trait]
pub trait Host: Send + Sync {
    /// Ordered children of `parent`, or the top-level items when `None`.
    async fn list_children(&self, parent: Option<ItemId>) -> Result<Vec<ItemId>>;

    /// Current name, kind and visibility of an item.
    async fn get_metadata(&self, item: ItemId) -> Result<ItemMetadata>;

    /// Run a host procedure against an item, modifying its pixel data.
    async fn apply_action(&self, item: ItemId, action_id: &str, args: &ArgMap) -> Result<()>;

    /// Write an item to `path`.
    async fn export(&self, item: ItemId, path: &Path, format_args: &ArgMap) -> Result<()>;

    /// Create a detached copy of an item that can be modified freely.
    async fn duplicate(&self, item: ItemId) -> Result<ItemId>;

    /// Release a copy created by [`Host::duplicate`].
    async fn discard(&self, item: ItemId) -> Result<()>;

    /// Render a thumbnail no larger than `max_size` on either side.
    async fn thumbnail(&self, item: ItemId, max_size: u32) -> Result<Thumbnail>;
}
