//! The `.code-search` file format.
//!
//! A plain-text, diff-friendly rendering of a search session:
//!
//! ```text
//! # Query: TODO
//! # Flags: RegExp CaseSensitive WordMatch
//! # Including: src/**
//! # Excluding: target/**
//!
//! 3 results - 2 files
//!
//! src/lib.rs:
//!   4,8: // TODO: document
//!   9,5,4,8: let TODO = 1;
//!
//! src/main.rs:
//!   1,1: TODO
//! ```
//!
//! Match records are indented by exactly two spaces and start with
//! `line,column` (optionally followed by `,start,end` byte offsets) and a
//! colon. Header values, paths and line text escape `\`, LF and CR as
//! `\\`, `\n` and `\r`; paths also escape a leading space (`\s`) or `#`
//! (`\#`) so a file header is never mistaken for a match or a comment.

use log::warn;

use crate::error::ParseError;
use crate::model::{MatchSpan, SearchMatch, SearchQuery, SearchResultEntry, total_matches};

/// File extension of saved searches, without the dot.
pub const CODE_SEARCH_EXTENSION: &str = "code-search";

/// Filename used when a pattern yields no usable characters.
pub const DEFAULT_FILENAME_STEM: &str = "search";

/// Longest filename stem produced by [`generate_code_search_filename`].
pub const MAX_FILENAME_STEM_LEN: usize = 48;

const MATCH_INDENT: &str = "  ";

const FLAG_REGEX: &str = "RegExp";
const FLAG_CASE_SENSITIVE: &str = "CaseSensitive";
const FLAG_WHOLE_WORD: &str = "WordMatch";

/// A search session as stored in a `.code-search` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSearchDocument {
    pub query: SearchQuery,
    pub results: Vec<SearchResultEntry>,
}

/// Renders `query` and `results` in the `.code-search` format.
///
/// Entries without matches are skipped so the summary line always agrees
/// with the body. Records are written only in a form [`parse`] accepts: byte
/// offsets that do not form a usable span are left out and a zero line or
/// column is written as 1.
///
/// # Arguments
///
/// * `query` - The query written to the header lines
/// * `results` - Per-file matches, written in the order given
///
/// # Returns
///
/// The file content, one record per line and ending with a newline.
pub fn serialize(query: &SearchQuery, results: &[SearchResultEntry]) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Query: {}\n", escape(&query.pattern)));

    let flags: Vec<&str> = [
        (query.is_regex, FLAG_REGEX),
        (query.is_case_sensitive, FLAG_CASE_SENSITIVE),
        (query.is_whole_word, FLAG_WHOLE_WORD),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect();
    if !flags.is_empty() {
        out.push_str(&format!("# Flags: {}\n", flags.join(" ")));
    }
    if let Some(include) = query.include_globs() {
        out.push_str(&format!("# Including: {}\n", escape(include)));
    }
    if let Some(exclude) = query.exclude_globs() {
        out.push_str(&format!("# Excluding: {}\n", escape(exclude)));
    }

    let files: Vec<&SearchResultEntry> =
        results.iter().filter(|e| !e.matches.is_empty()).collect();
    out.push('\n');
    out.push_str(&summary_line(total_matches(results), files.len()));
    out.push('\n');

    for entry in files {
        out.push('\n');
        out.push_str(&escape_path(&entry.file));
        out.push_str(":\n");
        for m in &entry.matches {
            out.push_str(MATCH_INDENT);
            out.push_str(&format!("{},{}", m.line.max(1), m.column.max(1)));
            if let MatchSpan::Explicit { start, end } = m.span() {
                out.push_str(&format!(",{},{}", start, end));
            }
            out.push_str(": ");
            out.push_str(&escape(&m.text));
            out.push('\n');
        }
    }

    out
}

/// Human-readable result summary, e.g. `3 results - 1 file`.
pub fn summary_line(result_count: usize, file_count: usize) -> String {
    format!(
        "{} {} - {} {}",
        result_count,
        if result_count == 1 { "result" } else { "results" },
        file_count,
        if file_count == 1 { "file" } else { "files" }
    )
}

/// Parses `.code-search` content.
///
/// Unknown header keys and flags are skipped with a warning. Anything that
/// would lose or misplace a match is reported as a [`ParseError`].
///
/// # Arguments
///
/// * `content` - Text previously produced by [`serialize`]; LF and CRLF line
///   endings are both accepted
///
/// # Returns
///
/// The query and results, with files and matches in file order.
///
/// # Errors
///
/// Returns [`ParseError::MissingQuery`] when there is no `# Query:` header,
/// and a line-numbered [`ParseError`] for malformed records, bad escapes,
/// file headers without matches or a summary line that disagrees with the
/// body.
pub fn parse(content: &str) -> Result<CodeSearchDocument, ParseError> {
    let mut query: Option<SearchQuery> = None;
    let mut flags = (false, false, false);
    let mut include: Option<String> = None;
    let mut exclude: Option<String> = None;

    let mut summary: Option<(usize, usize)> = None;
    let mut results: Vec<SearchResultEntry> = Vec::new();
    let mut current: Option<(usize, SearchResultEntry)> = None;
    let mut in_header = true;
    let mut seen_header = false;

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;

        if in_header {
            if !seen_header && line.trim().is_empty() {
                continue;
            }
            if let Some(header) = line.strip_prefix('#') {
                seen_header = true;
                let header = header.strip_prefix(' ').unwrap_or(header);
                let Some((key, value)) = header.split_once(':') else {
                    warn!(target: "format", "Skipping header line {}: {}", line_no, line);
                    continue;
                };
                let value = value.strip_prefix(' ').unwrap_or(value);
                match key {
                    "Query" => {
                        query = Some(SearchQuery::new(unescape(value, line_no)?));
                    }
                    "Flags" => flags = parse_flags(value, line_no),
                    "Including" => include = Some(unescape(value, line_no)?),
                    "Excluding" => exclude = Some(unescape(value, line_no)?),
                    other => {
                        warn!(target: "format", "Skipping unknown header '{}' on line {}", other, line_no);
                    }
                }
                continue;
            }
            in_header = false;
        }

        if line.trim().is_empty() {
            continue;
        }

        if let Some(record) = line.strip_prefix(MATCH_INDENT) {
            let m = parse_match(record, line, line_no)?;
            match current.as_mut() {
                Some((_, entry)) => entry.matches.push(m),
                None => return Err(ParseError::OrphanMatch { line: line_no }),
            }
            continue;
        }

        if current.is_none() && results.is_empty() && summary.is_none() {
            if let Some(counts) = parse_summary(line) {
                summary = Some(counts);
                continue;
            }
        }

        if let Some(path) = line.strip_suffix(':') {
            finish_file(&mut results, current.take())?;
            let file = unescape(path, line_no)?;
            current = Some((line_no, SearchResultEntry::new(file, Vec::new())));
            continue;
        }

        return Err(ParseError::UnexpectedLine {
            line: line_no,
            content: line.to_string(),
        });
    }
    finish_file(&mut results, current.take())?;

    let mut query = query.ok_or(ParseError::MissingQuery)?;
    (query.is_regex, query.is_case_sensitive, query.is_whole_word) = flags;
    query = query
        .include(include.unwrap_or_default())
        .exclude(exclude.unwrap_or_default());

    if let Some((expected_results, expected_files)) = summary {
        let found_results = total_matches(&results);
        let found_files = results.len();
        if expected_results != found_results || expected_files != found_files {
            return Err(ParseError::CountMismatch {
                expected_results,
                expected_files,
                found_results,
                found_files,
            });
        }
    }

    Ok(CodeSearchDocument { query, results })
}

fn finish_file(
    results: &mut Vec<SearchResultEntry>,
    current: Option<(usize, SearchResultEntry)>,
) -> Result<(), ParseError> {
    if let Some((line, entry)) = current {
        if entry.matches.is_empty() {
            return Err(ParseError::EmptyFile {
                line,
                file: entry.file,
            });
        }
        results.push(entry);
    }
    Ok(())
}

fn parse_flags(value: &str, line_no: usize) -> (bool, bool, bool) {
    let mut flags = (false, false, false);
    for flag in value.split_whitespace() {
        match flag {
            FLAG_REGEX => flags.0 = true,
            FLAG_CASE_SENSITIVE => flags.1 = true,
            FLAG_WHOLE_WORD => flags.2 = true,
            other => warn!(target: "format", "Ignoring unknown flag '{}' on line {}", other, line_no),
        }
    }
    flags
}

fn parse_summary(line: &str) -> Option<(usize, usize)> {
    let (results, files) = line.split_once(" - ")?;
    let (result_count, result_word) = results.split_once(' ')?;
    let (file_count, file_word) = files.split_once(' ')?;
    if !matches!(result_word, "result" | "results") || !matches!(file_word, "file" | "files") {
        return None;
    }
    Some((result_count.parse().ok()?, file_count.parse().ok()?))
}

fn parse_match(record: &str, raw: &str, line_no: usize) -> Result<SearchMatch, ParseError> {
    let invalid = || ParseError::InvalidMatch {
        line: line_no,
        content: raw.to_string(),
    };

    let (prefix, rest) = record.split_once(':').ok_or_else(invalid)?;
    let numbers = prefix
        .split(',')
        .map(|n| n.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| invalid())?;
    let text = unescape(rest.strip_prefix(' ').unwrap_or(rest), line_no)?;

    let m = match numbers.as_slice() {
        &[line, column] => SearchMatch::new(line, column, text),
        &[line, column, start, end] => {
            let start = usize::try_from(start).map_err(|_| invalid())?;
            let end = usize::try_from(end).map_err(|_| invalid())?;
            let m = SearchMatch::new(line, column, text).with_span(start, end);
            if m.span() == MatchSpan::Derived {
                return Err(invalid());
            }
            m
        }
        _ => return Err(invalid()),
    };

    if m.line == 0 || m.column == 0 {
        return Err(invalid());
    }
    Ok(m)
}

/// Escapes a value so it fits on a single line.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

fn escape_path(path: &str) -> String {
    let escaped = escape(path);
    if let Some(rest) = escaped.strip_prefix(' ') {
        format!("\\s{}", rest)
    } else if let Some(rest) = escaped.strip_prefix('#') {
        format!("\\#{}", rest)
    } else {
        escaped
    }
}

/// Reverses [`escape`] (and the path-only `\s` and `\#` escapes).
pub fn unescape(value: &str, line_no: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('s') => out.push(' '),
            Some('#') => out.push('#'),
            _ => return Err(ParseError::InvalidEscape { line: line_no }),
        }
    }
    Ok(out)
}

/// Suggests a filesystem-safe filename for a search on `pattern`.
///
/// Keeps lowercase ASCII alphanumerics, collapses everything else into single
/// dashes and truncates the stem. Never returns an empty stem.
pub fn generate_code_search_filename(pattern: &str) -> String {
    let mut stem = String::new();
    let mut separator = false;

    for c in pattern.chars() {
        if !c.is_ascii_alphanumeric() {
            separator = true;
            continue;
        }
        let needs_dash = separator && !stem.is_empty();
        if stem.len() + usize::from(needs_dash) + 1 > MAX_FILENAME_STEM_LEN {
            break;
        }
        if needs_dash {
            stem.push('-');
        }
        stem.push(c.to_ascii_lowercase());
        separator = false;
    }

    if stem.is_empty() {
        stem.push_str(DEFAULT_FILENAME_STEM);
    } else if is_reserved_device_name(&stem) {
        stem.push('-');
        stem.push_str(DEFAULT_FILENAME_STEM);
    }
    format!("{}.{}", stem, CODE_SEARCH_EXTENSION)
}

/// Names Windows refuses as file stems regardless of extension.
fn is_reserved_device_name(stem: &str) -> bool {
    match stem {
        "con" | "prn" | "aux" | "nul" => true,
        _ => {
            let digit = stem.strip_prefix("com").or_else(|| stem.strip_prefix("lpt"));
            matches!(digit, Some(d) if d.len() == 1 && d != "0" && d.chars().all(|c| c.is_ascii_digit()))
        }
    }
}
