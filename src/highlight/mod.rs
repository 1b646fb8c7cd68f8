//! Match highlighting.
//!
//! Splits a match line into the text before the match, the matched span and
//! the text after it. Explicit offsets from the search provider win; without
//! them the span is re-derived from the query pattern.

use log::debug;
use regex::{Regex, RegexBuilder};

use crate::error::PatternError;
use crate::model::{MatchSpan, SearchMatch, SearchQuery};

/// A match line split around its highlighted span.
///
/// `before + highlighted + after` always reproduces the original line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight<'a> {
    pub before: &'a str,
    pub highlighted: &'a str,
    pub after: &'a str,
}

impl<'a> Highlight<'a> {
    /// The whole line rendered without any highlighted span.
    pub fn plain(text: &'a str) -> Self {
        Self {
            before: text,
            highlighted: "",
            after: "",
        }
    }

    fn split(text: &'a str, start: usize, end: usize) -> Self {
        Self {
            before: &text[..start],
            highlighted: &text[start..end],
            after: &text[end..],
        }
    }

    /// Whether any part of the line is highlighted.
    pub fn is_highlighted(&self) -> bool {
        !self.highlighted.is_empty()
    }
}

/// Computes the highlighted span of `m`.
///
/// Uses the match's explicit offsets when present and non-empty; otherwise
/// searches `m.text` once for `pattern` (a regex when `is_regex`, a literal
/// otherwise) and splits at the first match, even a zero-length one.
/// Invalid patterns and misses fall back to [`Highlight::plain`].
///
/// # Arguments
///
/// * `m` - The match whose line is split
/// * `pattern` - Pattern used when `m` carries no usable offsets
/// * `is_regex` - Whether `pattern` is a regular expression
/// * `is_case_sensitive` - Whether letter case must match
///
/// # Returns
///
/// A [`Highlight`] borrowing from `m.text`; its three parts always
/// concatenate back to the full line.
///
/// # Examples
///
/// ```
/// use codesearch::highlight::highlight;
/// use codesearch::model::SearchMatch;
///
/// let m = SearchMatch::new(1, 1, "foo bar foo");
/// let h = highlight(&m, "bar", false, false);
/// assert_eq!((h.before, h.highlighted, h.after), ("foo ", "bar", " foo"));
/// ```
pub fn highlight<'a>(
    m: &'a SearchMatch,
    pattern: &str,
    is_regex: bool,
    is_case_sensitive: bool,
) -> Highlight<'a> {
    highlight_with(m, || compile(pattern, is_regex, is_case_sensitive, false))
}

/// Like [`highlight`], taking every option (including whole-word) from `query`.
pub fn highlight_for_query<'a>(m: &'a SearchMatch, query: &SearchQuery) -> Highlight<'a> {
    highlight_with(m, || compile_query(query))
}

fn highlight_with<'a, F>(m: &'a SearchMatch, matcher: F) -> Highlight<'a>
where
    F: FnOnce() -> Result<Regex, PatternError>,
{
    let text = m.text.as_str();

    match m.span() {
        MatchSpan::Explicit { start, end } if start != end => Highlight::split(text, start, end),
        _ => match matcher() {
            Ok(regex) => match regex.find(text) {
                Some(found) => Highlight::split(text, found.start(), found.end()),
                None => Highlight::plain(text),
            },
            Err(e) => {
                debug!(target: "highlight", "{}", e);
                Highlight::plain(text)
            }
        },
    }
}

/// Builds the regular expression source for a pattern.
///
/// Literal patterns are escaped; whole-word patterns are anchored on word
/// boundaries.
pub fn pattern_source(pattern: &str, is_regex: bool, is_whole_word: bool) -> String {
    let body = if is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };

    if is_whole_word {
        format!(r"\b(?:{})\b", body)
    } else {
        body
    }
}

/// Compiles a pattern with the given options.
pub fn compile(
    pattern: &str,
    is_regex: bool,
    is_case_sensitive: bool,
    is_whole_word: bool,
) -> Result<Regex, PatternError> {
    RegexBuilder::new(&pattern_source(pattern, is_regex, is_whole_word))
        .case_insensitive(!is_case_sensitive)
        .build()
        .map_err(|source| PatternError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Compiles the expression described by `query`.
pub fn compile_query(query: &SearchQuery) -> Result<Regex, PatternError> {
    compile(
        &query.pattern,
        query.is_regex,
        query.is_case_sensitive,
        query.is_whole_word,
    )
}
