//! Stable per-file grouping of search results.
//!
//! Keeps file order deterministic and carries each file's expand/collapse
//! decision across re-renders and re-runs of a search.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{SearchMatch, SearchResultEntry};

/// Files with at most this many matches start out expanded.
pub const DEFAULT_COLLAPSE_THRESHOLD: usize = 10;

/// Expanded flag per file path.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FileGroupState {
    expanded: HashMap<String, bool>,
}

impl FileGroupState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `file` is expanded. Unknown files are collapsed.
    pub fn is_expanded(&self, file: &str) -> bool {
        self.expanded.get(file).copied().unwrap_or(false)
    }

    /// The recorded flag for `file`, if any.
    pub fn get(&self, file: &str) -> Option<bool> {
        self.expanded.get(file).copied()
    }

    pub fn len(&self) -> usize {
        self.expanded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    fn set(&mut self, file: &str, expanded: bool) {
        self.expanded.insert(file.to_string(), expanded);
    }
}

/// Recomputes group state for a new result set using the default threshold.
///
/// # Examples
///
/// ```
/// use codesearch::grouping::{FileGroupState, reconcile};
/// use codesearch::model::{SearchMatch, SearchResultEntry};
///
/// let many = (1..=12).map(|line| SearchMatch::new(line, 1, "TODO")).collect();
/// let results = vec![
///     SearchResultEntry::new("a.ts", many),
///     SearchResultEntry::new("b.ts", vec![SearchMatch::new(1, 1, "TODO")]),
/// ];
///
/// let state = reconcile(&FileGroupState::new(), &results);
/// assert!(!state.is_expanded("a.ts"));
/// assert!(state.is_expanded("b.ts"));
/// ```
pub fn reconcile(previous: &FileGroupState, results: &[SearchResultEntry]) -> FileGroupState {
    reconcile_with_threshold(previous, results, DEFAULT_COLLAPSE_THRESHOLD)
}

/// Recomputes group state for a new result set.
///
/// A file seen before keeps its flag; a new file is expanded when it has at
/// most `threshold` matches. Files missing from `results` are dropped.
///
/// # Arguments
///
/// * `previous` - Group state from the last render or run
/// * `results` - The new result set
/// * `threshold` - Largest match count a new file may have and still start
///   expanded
///
/// # Returns
///
/// A state with exactly one flag per file in `results`. Reconciling that
/// state against the same results again returns it unchanged.
pub fn reconcile_with_threshold(
    previous: &FileGroupState,
    results: &[SearchResultEntry],
    threshold: usize,
) -> FileGroupState {
    let mut state = FileGroupState::new();
    for entry in results {
        let expanded = previous
            .get(&entry.file)
            .unwrap_or(entry.match_count() <= threshold);
        state.set(&entry.file, expanded);
    }
    state
}

/// Flips the flag of exactly one file.
pub fn toggle(state: &FileGroupState, file: &str) -> FileGroupState {
    let mut next = state.clone();
    next.set(file, !state.is_expanded(file));
    next
}

/// Marks every file in `files` as expanded.
pub fn expand_all<I, S>(files: I) -> FileGroupState
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    uniform(files, true)
}

/// Marks every file in `files` as collapsed.
pub fn collapse_all<I, S>(files: I) -> FileGroupState
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    uniform(files, false)
}

fn uniform<I, S>(files: I, expanded: bool) -> FileGroupState
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut state = FileGroupState::new();
    for file in files {
        state.set(file.as_ref(), expanded);
    }
    state
}

/// Groups a flat list of `(file, match)` pairs into result entries.
///
/// Files keep the order in which they are first seen; matches inside a file
/// are sorted by line and column, keeping the incoming order on ties.
pub fn group_matches<I, S>(flat: I) -> Vec<SearchResultEntry>
where
    I: IntoIterator<Item = (S, SearchMatch)>,
    S: Into<String>,
{
    let mut entries: Vec<SearchResultEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (file, m) in flat {
        let file = file.into();
        match index.get(&file) {
            Some(&i) => entries[i].matches.push(m),
            None => {
                index.insert(file.clone(), entries.len());
                entries.push(SearchResultEntry::new(file, vec![m]));
            }
        }
    }

    for entry in &mut entries {
        entry.matches.sort_by_key(|m| (m.line, m.column));
    }
    entries
}

/// Normalises semi-grouped entries from a search provider.
///
/// Entries for the same file are merged at the position of the first one and
/// files without matches are removed.
pub fn normalize_entries(entries: Vec<SearchResultEntry>) -> Vec<SearchResultEntry> {
    group_matches(
        entries
            .into_iter()
            .flat_map(|entry| {
                let file = entry.file;
                entry.matches.into_iter().map(move |m| (file.clone(), m))
            }),
    )
}

#[cfg(test)]
mod tests;
