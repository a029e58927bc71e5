//! # lf-rules
//!
//! Conditions that decide whether an item is admitted to the rest of a
//! command pipeline.
//!
//! - [`Condition`] -- leaf conditions testing a single item property.
//! - [`Expr`] -- expression tree combining conditions with AND/OR/NOT.
//! - [`Subject`] -- the item view conditions are evaluated against.
//! - [`CompiledExpr`] -- a validated expression with its patterns compiled.

pub mod compiled;
pub mod condition;
pub mod expr;

pub use compiled::CompiledExpr;
pub use condition::{Condition, MatchMode, Subject};
pub use expr::{evaluate, Expr};

/// Deserialize an expression from a [`serde_json::Value`].
///
/// Goes through a string so the recursive serde code stays in this crate.
pub fn expr_from_value(value: &serde_json::Value) -> Result<Expr, serde_json::Error> {
    let s = serde_json::to_string(value)?;
    serde_json::from_str(&s)
}
