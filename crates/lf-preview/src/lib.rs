//! # lf-preview
//!
//! Non-destructive preview of a batch: which items would be processed,
//! under which names, and what image actions would do to them.
//!
//! [`PreviewRenderer`] keeps the last completed [`PreviewState`] and
//! rebuilds only what a [`SettingChange`] makes stale. Image actions run on
//! disposable host copies, never on the original items.

pub mod invalidate;
pub mod renderer;
pub mod state;

pub use invalidate::{CommandField, Invalidation, SettingChange};
pub use renderer::{PreviewRenderer, RenderOutcome};
pub use state::{PreviewEntry, PreviewInput, PreviewOptions, PreviewState};
