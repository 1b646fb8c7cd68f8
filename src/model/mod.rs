//! Core value types shared by every part of the search-results model.
//!
//! A [`SearchQuery`] describes one search intent, a [`SearchMatch`] is one
//! matching line, and a [`SearchResultEntry`] groups the matches of a single
//! file. [`SearchEditorState`] is the aggregate owned by a session.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An immutable description of one search intent.
///
/// Re-running a search produces a new result set against the same query;
/// the query itself is never mutated in place.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Text or regular expression to search for
    pub pattern: String,

    /// Whether `pattern` is a regular expression rather than a literal
    pub is_regex: bool,

    /// Whether matching distinguishes letter case
    pub is_case_sensitive: bool,

    /// Whether matches must be bounded by word boundaries
    pub is_whole_word: bool,

    /// Comma-separated globs a file must match to be searched
    pub include_pattern: Option<String>,

    /// Comma-separated globs excluding files from the search
    pub exclude_pattern: Option<String>,
}

impl SearchQuery {
    /// Creates a literal, case-insensitive query for `pattern`.
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            ..Self::default()
        }
    }

    pub fn regex(mut self, is_regex: bool) -> Self {
        self.is_regex = is_regex;
        self
    }

    pub fn case_sensitive(mut self, is_case_sensitive: bool) -> Self {
        self.is_case_sensitive = is_case_sensitive;
        self
    }

    pub fn whole_word(mut self, is_whole_word: bool) -> Self {
        self.is_whole_word = is_whole_word;
        self
    }

    /// Sets the include globs. An empty string is stored as absent.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_pattern = non_empty(pattern.into());
        self
    }

    /// Sets the exclude globs. An empty string is stored as absent.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_pattern = non_empty(pattern.into());
        self
    }

    /// Include globs, treating an empty string the same as `None`.
    pub fn include_globs(&self) -> Option<&str> {
        self.include_pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// Exclude globs, treating an empty string the same as `None`.
    pub fn exclude_globs(&self) -> Option<&str> {
        self.exclude_pattern.as_deref().filter(|p| !p.is_empty())
    }

    /// Compares two queries field by field, with empty include/exclude
    /// patterns considered equal to absent ones.
    pub fn is_equivalent(&self, other: &SearchQuery) -> bool {
        self.pattern == other.pattern
            && self.is_regex == other.is_regex
            && self.is_case_sensitive == other.is_case_sensitive
            && self.is_whole_word == other.is_whole_word
            && self.include_globs() == other.include_globs()
            && self.exclude_globs() == other.exclude_globs()
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// One matching line in one file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// Line number of the match (1-based)
    pub line: u64,

    /// Column of the first matched character (1-based)
    pub column: u64,

    /// The full source line, without its line terminator
    pub text: String,

    /// Byte offset into `text` where the matched span starts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_start: Option<usize>,

    /// Byte offset into `text` where the matched span ends (exclusive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_end: Option<usize>,
}

impl SearchMatch {
    /// A match without explicit offsets; its span is derived on demand.
    pub fn new(line: u64, column: u64, text: impl Into<String>) -> Self {
        Self {
            line,
            column,
            text: text.into(),
            match_start: None,
            match_end: None,
        }
    }

    /// Attaches explicit byte offsets of the matched span.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.match_start = Some(start);
        self.match_end = Some(end);
        self
    }

    /// Resolves how the highlighted span of this match is obtained.
    ///
    /// Offsets are only honoured when both are present, ordered, inside the
    /// text and on UTF-8 character boundaries.
    pub fn span(&self) -> MatchSpan {
        match (self.match_start, self.match_end) {
            (Some(start), Some(end))
                if start <= end
                    && end <= self.text.len()
                    && self.text.is_char_boundary(start)
                    && self.text.is_char_boundary(end) =>
            {
                MatchSpan::Explicit { start, end }
            }
            _ => MatchSpan::Derived,
        }
    }
}

/// Where the highlighted part of a match comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSpan {
    /// Offsets supplied by the search provider
    Explicit { start: usize, end: usize },
    /// Offsets must be recomputed from the query
    Derived,
}

/// All matches found in a single file, ordered by ascending line number.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchResultEntry {
    /// Absolute or project-relative path of the file
    pub file: String,

    /// Matches in this file
    pub matches: Vec<SearchMatch>,
}

impl SearchResultEntry {
    pub fn new(file: impl Into<String>, matches: Vec<SearchMatch>) -> Self {
        Self {
            file: file.into(),
            matches,
        }
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Total number of matches across all entries.
pub fn total_matches(results: &[SearchResultEntry]) -> usize {
    results.iter().map(SearchResultEntry::match_count).sum()
}

/// The aggregate root of one search editor tab.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SearchEditorState {
    pub id: String,
    pub query: SearchQuery,
    pub results: Vec<SearchResultEntry>,

    /// Contents differ from what was last saved or loaded
    pub is_dirty: bool,

    /// The session is associated with a file on disk
    pub is_persisted: bool,

    pub file_path: Option<PathBuf>,
}

impl SearchEditorState {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            query: SearchQuery::default(),
            results: Vec::new(),
            is_dirty: false,
            is_persisted: false,
            file_path: None,
        }
    }
}

#[cfg(test)]
mod tests;
