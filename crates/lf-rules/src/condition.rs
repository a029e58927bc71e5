//! Leaf conditions that evaluate against a single item.
//!
//! Each [`Condition`] variant checks one property of an item as the pipeline
//! currently sees it. Conditions are composed into expression trees via
//! [`Expr`](crate::Expr).

use lf_core::{Error, ItemKind, Result};
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

/// The view of an item that conditions are evaluated against.
///
/// `name` is the item's current processed name, so conditions placed after a
/// rename see the renamed value.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub name: &'a str,
    pub kind: ItemKind,
    pub visible: bool,
    pub depth: usize,
    pub child_count: usize,
    pub selected: bool,
}

/// How a [`Condition::Name`] compares the item name with its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    StartsWith,
    DoesNotStartWith,
    Contains,
    DoesNotContain,
    EndsWith,
    DoesNotEndWith,
    Regex,
}

/// A leaf condition that evaluates a single property of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Condition {
    /// Matches the item name against `text`. Empty text matches everything.
    Name {
        mode: MatchMode,
        text: String,
        #[serde(default)]
        ignore_case: bool,
    },
    /// Matches if the item kind is in the given list.
    Kind(Vec<ItemKind>),
    /// Matches if the item visibility equals the given value.
    Visible(bool),
    /// Matches top-level items only.
    TopLevel,
    /// Matches groups that have at least one child.
    NonEmptyGroup,
    /// Matches on the extension of the item name (case-insensitive).
    FileExtension(Vec<String>),
    /// Matches items that are part of the user's selection.
    Selected,
}

impl Condition {
    /// Check that the condition can be evaluated, e.g. that a regex compiles.
    pub fn validate(&self) -> Result<()> {
        match self {
            Condition::Name {
                mode: MatchMode::Regex,
                text,
                ignore_case,
            } => RegexBuilder::new(text)
                .case_insensitive(*ignore_case)
                .build()
                .map(|_| ())
                .map_err(|e| Error::Validation(format!("invalid name pattern {text:?}: {e}"))),
            Condition::FileExtension(extensions) if extensions.is_empty() => Err(
                Error::Validation("file_extension condition needs at least one extension".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Evaluate this condition against the given item.
    pub fn evaluate(&self, subject: &Subject<'_>) -> bool {
        match self {
            Condition::Name {
                mode,
                text,
                ignore_case,
            } => match_name(subject.name, *mode, text, *ignore_case),
            Condition::Kind(kinds) => kinds.contains(&subject.kind),
            Condition::Visible(value) => subject.visible == *value,
            Condition::TopLevel => subject.depth == 0,
            Condition::NonEmptyGroup => subject.kind == ItemKind::Group && subject.child_count > 0,
            Condition::FileExtension(extensions) => match extension_of(subject.name) {
                Some(ext) => extensions
                    .iter()
                    .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(ext)),
                None => false,
            },
            Condition::Selected => subject.selected,
        }
    }
}

fn extension_of(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        None
    } else {
        Some(ext)
    }
}

fn match_name(name: &str, mode: MatchMode, text: &str, ignore_case: bool) -> bool {
    if text.is_empty() {
        return true;
    }

    if mode == MatchMode::Regex {
        return match RegexBuilder::new(text).case_insensitive(ignore_case).build() {
            Ok(re) => re.is_match(name),
            Err(e) => {
                tracing::warn!("Ignoring invalid name pattern {text:?}: {e}");
                false
            }
        };
    }

    let (name, text) = if ignore_case {
        (name.to_lowercase(), text.to_lowercase())
    } else {
        (name.to_string(), text.to_string())
    };

    match mode {
        MatchMode::StartsWith => name.starts_with(&text),
        MatchMode::DoesNotStartWith => !name.starts_with(&text),
        MatchMode::Contains => name.contains(&text),
        MatchMode::DoesNotContain => !name.contains(&text),
        MatchMode::EndsWith => name.ends_with(&text),
        MatchMode::DoesNotEndWith => !name.ends_with(&text),
        MatchMode::Regex => false,
    }
}
