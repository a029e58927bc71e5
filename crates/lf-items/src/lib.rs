//! # lf-items
//!
//! Access to the host application's item tree.
//!
//! - **[`Host`]** -- the interface layerforge needs from an image editor.
//! - **[`ItemTree`]** -- an indexed snapshot with parent/child lookups.
//! - **[`Traverser`]** -- takes a fresh snapshot per run and yields items in
//!   depth-first pre-order, with output folder segments per traversal mode.
//! - **[`MemoryHost`]** -- in-memory host for tests and the CLI.

pub mod host;
pub mod memory;
pub mod traverse;
pub mod tree;

pub use host::{Host, Thumbnail};
pub use memory::{AppliedAction, ExportRecord, MemoryHost};
pub use traverse::{Enumeration, Scope, Traversal, Traverser, Visit};
pub use tree::{Item, ItemTree};
