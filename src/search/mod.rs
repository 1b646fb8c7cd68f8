//! Filesystem search provider.
//!
//! Walks a directory (respecting `.gitignore` by default), filters files by
//! the query's include/exclude globs and searches each file line by line with
//! the `grep` searcher. Every match carries explicit byte offsets so the
//! highlighter never has to re-scan.

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use grep::matcher::Matcher;
use grep::regex::{RegexMatcher, RegexMatcherBuilder};
use grep::searcher::sinks::UTF8;
use grep::searcher::{BinaryDetection, SearcherBuilder};
use ignore::WalkBuilder;
use log::Level;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::highlight::pattern_source;
use crate::model::{SearchMatch, SearchQuery, SearchResultEntry};
use crate::paths::{display_path, remove_path_prefix, to_slash};
use crate::session::SearchProvider;
use crate::telemetry::{LogMessage, log_with_context};

/// Configuration for filesystem searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsSearchOptions {
    /// Skip files ignored by `.gitignore` and hidden files.
    pub respect_gitignore: bool,

    /// Maximum directory depth to descend into; `None` for unlimited.
    pub max_depth: Option<usize>,

    /// Report paths relative to the search root instead of as walked.
    pub relative_paths: bool,
}

impl Default for FsSearchOptions {
    fn default() -> Self {
        Self {
            respect_gitignore: true,
            max_depth: Some(20),
            relative_paths: true,
        }
    }
}

/// A [`SearchProvider`] over a directory tree (or a single file).
#[derive(Debug, Clone)]
pub struct FsSearchProvider {
    root: PathBuf,
    options: FsSearchOptions,
}

impl FsSearchProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, FsSearchOptions::default())
    }

    pub fn with_options(root: impl Into<PathBuf>, options: FsSearchOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SearchProvider for FsSearchProvider {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultEntry>> {
        search_directory(&self.root, query, &self.options)
    }
}

/// Searches every eligible file under `root` for `query`.
///
/// Files come back sorted by path, matches by line. An empty pattern yields
/// no results.
///
/// # Arguments
///
/// * `root` - Directory to walk, or a single file to search
/// * `query` - Pattern, matching flags and include/exclude globs
/// * `options` - Traversal and path display options
///
/// # Returns
///
/// One entry per file with at least one match. Each match carries the byte
/// offsets of the first hit on its line and a 1-based character column.
///
/// # Errors
///
/// Returns an error if the pattern or one of the globs is invalid. Files that
/// cannot be opened or decoded are logged and skipped.
pub fn search_directory(
    root: &Path,
    query: &SearchQuery,
    options: &FsSearchOptions,
) -> Result<Vec<SearchResultEntry>> {
    if query.pattern.is_empty() {
        return Ok(Vec::new());
    }

    let matcher = RegexMatcherBuilder::new()
        .case_insensitive(!query.is_case_sensitive)
        .build(&pattern_source(
            &query.pattern,
            query.is_regex,
            query.is_whole_word,
        ))
        .context("Failed to create regular expression matcher")?;

    let filter = GlobFilter::new(query.include_globs(), query.exclude_globs())?;

    // Paths are shown relative to the directory searched, or to the parent
    // when a single file is searched
    let base = if root.is_dir() {
        root.to_path_buf()
    } else {
        root.parent().map(Path::to_path_buf).unwrap_or_default()
    };

    let files = collect_files(root, &base, options, &filter)
        .context("Failed to collect files for searching")?;

    let mut searcher = SearcherBuilder::new()
        .binary_detection(BinaryDetection::quit(b'\x00'))
        .build();

    let mut results = Vec::new();
    for file_path in files {
        let file = match File::open(&file_path) {
            Ok(f) => f,
            Err(e) => {
                log_with_context(
                    Level::Warn,
                    LogMessage::new("search", format!("Failed to open file: {}", e))
                        .with("file_path", file_path.display()),
                );
                continue;
            }
        };

        let mut matches = Vec::new();
        let searched = searcher.search_file(
            &matcher,
            &file,
            UTF8(|line_number, line| {
                matches.push(to_match(&matcher, line_number, line));
                Ok(true)
            }),
        );
        if let Err(e) = searched {
            log_with_context(
                Level::Warn,
                LogMessage::new("search", format!("Error searching file: {}", e))
                    .with("file_path", file_path.display()),
            );
            continue;
        }

        if !matches.is_empty() {
            let shown = if options.relative_paths {
                display_path(&file_path.to_string_lossy(), Some(base.as_path()))
            } else {
                to_slash(&file_path)
            };
            results.push(SearchResultEntry::new(shown, matches));
        }
    }

    log_with_context(
        Level::Debug,
        LogMessage::new("search", "Search finished")
            .with("pattern", &query.pattern)
            .with("files", results.len()),
    );
    Ok(results)
}

/// Builds a match for one line reported by the searcher.
fn to_match(matcher: &RegexMatcher, line_number: u64, line: &str) -> SearchMatch {
    let text = line.trim_end_matches(['\n', '\r']);
    let span = matcher
        .find(text.as_bytes())
        .ok()
        .flatten()
        .filter(|m| text.is_char_boundary(m.start()) && text.is_char_boundary(m.end()));

    match span {
        Some(m) => {
            let column = text[..m.start()].chars().count() as u64 + 1;
            SearchMatch::new(line_number, column, text).with_span(m.start(), m.end())
        }
        None => SearchMatch::new(line_number, 1, text),
    }
}

/// Collects the files under `root` that pass the ignore rules and `filter`.
fn collect_files(
    root: &Path,
    base: &Path,
    options: &FsSearchOptions,
    filter: &GlobFilter,
) -> Result<Vec<PathBuf>> {
    let mut builder = WalkBuilder::new(root);
    builder.git_ignore(options.respect_gitignore);
    builder.hidden(options.respect_gitignore);
    builder.max_depth(options.max_depth);
    // Honour .gitignore outside of git repositories too
    builder.require_git(false);
    if !options.respect_gitignore {
        builder.ignore(false);
        builder.git_exclude(false);
        builder.git_global(false);
    }

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if !entry.file_type().is_some_and(|t| t.is_file()) {
                    continue;
                }
                let relative = remove_path_prefix(entry.path(), base);
                if filter.accepts(&to_slash(&relative)) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => {
                log_with_context(
                    Level::Warn,
                    LogMessage::new("search", format!("Error walking directory: {}", err))
                        .with("directory", root.display()),
                );
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Include/exclude glob filter over `/`-separated relative paths.
///
/// Each pattern is a comma-separated list. A glob without a leading `**/` or
/// `/` matches at any depth, and a glob naming a directory also matches
/// everything beneath it.
struct GlobFilter {
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl GlobFilter {
    fn new(include: Option<&str>, exclude: Option<&str>) -> Result<Self> {
        Ok(Self {
            include: include.map(build_glob_set).transpose()?.flatten(),
            exclude: exclude.map(build_glob_set).transpose()?.flatten(),
        })
    }

    fn accepts(&self, relative: &str) -> bool {
        if self.exclude.as_ref().is_some_and(|set| set.is_match(relative)) {
            return false;
        }
        self.include.as_ref().is_none_or(|set| set.is_match(relative))
    }
}

fn build_glob_set(patterns: &str) -> Result<Option<GlobSet>> {
    let mut builder = GlobSetBuilder::new();
    let mut count = 0;

    for pattern in patterns.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let anchored = pattern.strip_prefix('/');
        let base = anchored.unwrap_or(pattern).trim_end_matches('/');

        let mut variants = vec![base.to_string(), format!("{}/**", base)];
        if anchored.is_none() && !base.starts_with("**/") {
            variants.push(format!("**/{}", base));
            variants.push(format!("**/{}/**", base));
        }
        for variant in variants {
            builder.add(compile_glob(&variant, pattern)?);
        }
        count += 1;
    }

    if count == 0 {
        return Ok(None);
    }
    let set = builder
        .build()
        .with_context(|| format!("Failed to build glob set from '{}'", patterns))?;
    Ok(Some(set))
}

fn compile_glob(glob: &str, original: &str) -> Result<Glob> {
    GlobBuilder::new(glob)
        .literal_separator(true)
        .build()
        .with_context(|| format!("Invalid glob pattern '{}'", original))
}
