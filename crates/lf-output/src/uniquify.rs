//! Per-folder filename uniquifier.
//!
//! Within one run, no two outputs in the same folder may end up with the same
//! name. The first claimant keeps the original name; later ones get the
//! smallest ` (n)` suffix that is still free.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::naming::insert_suffix;

/// Tracks the names claimed in each output folder during a run.
#[derive(Debug, Default, Clone)]
pub struct Uniquifier {
    claimed: HashMap<PathBuf, HashSet<String>>,
}

impl Uniquifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `name` in `folder`, returning the name actually granted.
    pub fn claim(&mut self, folder: &Path, name: &str) -> String {
        let granted = self.candidate(folder, name);
        self.record(folder, &granted);
        granted
    }

    /// The name [`claim`](Self::claim) would grant, without claiming it.
    pub fn candidate(&self, folder: &Path, name: &str) -> String {
        if self.is_claimed(folder, name) {
            self.free_suffix(folder, name, |_| false)
        } else {
            name.to_string()
        }
    }

    /// Smallest ` (n)` variant of `name` that is unclaimed in `folder` and
    /// not rejected by `taken`. Does not claim it.
    pub fn free_suffix(&self, folder: &Path, name: &str, taken: impl Fn(&str) -> bool) -> String {
        (1..)
            .map(|n| insert_suffix(name, n))
            .find(|variant| !self.is_claimed(folder, variant) && !taken(variant))
            .unwrap_or_else(|| name.to_string())
    }

    /// Mark `name` as used in `folder`.
    pub fn record(&mut self, folder: &Path, name: &str) {
        self.claimed
            .entry(folder.to_path_buf())
            .or_default()
            .insert(name.to_string());
    }

    pub fn is_claimed(&self, folder: &Path, name: &str) -> bool {
        self.claimed
            .get(folder)
            .is_some_and(|taken| taken.contains(name))
    }

    /// Number of names claimed across all folders.
    pub fn len(&self) -> usize {
        self.claimed.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every claim, e.g. before a new run.
    pub fn reset(&mut self) {
        self.claimed.clear();
    }
}

/// Assign unique paths to a whole batch of `(folder, name)` pairs in order.
pub fn uniquify_all<'a, I>(pairs: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = (&'a Path, &'a str)>,
{
    let mut uniquifier = Uniquifier::new();
    pairs
        .into_iter()
        .map(|(folder, name)| folder.join(uniquifier.claim(folder, name)))
        .collect()
}
