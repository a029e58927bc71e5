//! # lf-output
//!
//! Output naming for batch runs.
//!
//! - [`Uniquifier`] -- keeps output names unique per folder within a run.
//! - [`OverwriteResolver`] -- applies the overwrite policy to paths that
//!   already exist on disk, asking an [`OverwriteDecider`] in `ask` mode.
//! - [`naming`] -- suffix insertion, extension handling, filename sanitizing.

pub mod naming;
pub mod overwrite;
pub mod uniquify;

pub use naming::{insert_suffix, sanitize_filename};
pub use overwrite::{
    decision_channel, ChannelDecider, FixedDecider, OverwriteDecider, OverwriteDecision,
    OverwriteResolver, PendingDecision, Resolution,
};
pub use uniquify::{uniquify_all, Uniquifier};
