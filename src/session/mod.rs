//! The search session controller.
//!
//! A [`SearchSession`] owns one search editor's query, results, group state
//! and dirty/persisted flags, and dispatches re-run, save, copy and clear
//! operations to external collaborators.
//!
//! Search execution is asynchronous from the session's point of view: a
//! search is started with [`SearchSession::begin_search`], which hands out a
//! [`SearchTicket`], and finished with [`SearchSession::complete_search`].
//! Only the most recent ticket is applied; older results are discarded.

use anyhow::Result;
use log::Level;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::SessionError;
use crate::format;
use crate::grouping::{self, DEFAULT_COLLAPSE_THRESHOLD, FileGroupState};
use crate::model::{SearchEditorState, SearchMatch, SearchQuery, SearchResultEntry};
use crate::paths::display_path;
use crate::telemetry::{LogMessage, log_with_context};

/// Produces results for a query.
pub trait SearchProvider {
    fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResultEntry>>;
}

/// Opens a file in an editor.
pub trait EditorOpener {
    fn open_file_at_location(&mut self, path: &str, line: u64, column: Option<u64>);
}

/// Saves and loads `.code-search` content.
pub trait ContentStore {
    /// Persists `text`. Returns the path written, or `None` when the user
    /// cancelled the save.
    fn save_content(&mut self, text: &str, suggested_filename: &str) -> Result<Option<PathBuf>>;

    fn load_content(&mut self, path: &Path) -> Result<String>;
}

/// Writes text to the system clipboard.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// The external collaborators a session delegates to.
pub struct Collaborators {
    pub editor: Box<dyn EditorOpener>,
    pub store: Box<dyn ContentStore>,
    pub clipboard: Box<dyn Clipboard>,
}

/// Configuration for a session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Files with more matches than this start out collapsed
    pub collapse_threshold: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            collapse_threshold: DEFAULT_COLLAPSE_THRESHOLD,
        }
    }
}

/// Options for rendering results as plain text.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyOptions {
    /// Show file paths relative to this directory when they lie under it
    pub strip_prefix: Option<PathBuf>,

    /// Render `line:column` instead of just the line number
    pub include_columns: bool,
}

/// Lifecycle of a session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Searching,
    Ready,
}

/// Identifies one in-flight search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchTicket(u64);

/// What happened to a finished search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results replaced the session's result set
    Applied,
    /// A newer search superseded this one; its results were dropped
    Discarded,
}

struct PendingSearch {
    ticket: SearchTicket,
    query: SearchQuery,
    resume: SessionStatus,
}

/// One search editor session.
pub struct SearchSession {
    state: SearchEditorState,
    status: SessionStatus,
    groups: FileGroupState,
    pending: Option<PendingSearch>,
    next_ticket: u64,
    options: SessionOptions,
    collaborators: Collaborators,
}

impl SearchSession {
    /// Creates an empty, unsaved session.
    pub fn new(id: impl Into<String>, collaborators: Collaborators) -> Self {
        Self::with_options(id, collaborators, SessionOptions::default())
    }

    pub fn with_options(
        id: impl Into<String>,
        collaborators: Collaborators,
        options: SessionOptions,
    ) -> Self {
        Self {
            state: SearchEditorState::new(id),
            status: SessionStatus::Idle,
            groups: FileGroupState::new(),
            pending: None,
            next_ticket: 0,
            options,
            collaborators,
        }
    }

    /// Restores a session from a saved `.code-search` file.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persistence`] when the file cannot be loaded
    /// and [`SessionError::Parse`] when its content is malformed.
    pub fn open(
        id: impl Into<String>,
        path: &Path,
        mut collaborators: Collaborators,
        options: SessionOptions,
    ) -> Result<Self, SessionError> {
        let content = collaborators
            .store
            .load_content(path)
            .map_err(|e| SessionError::persistence("load", e))?;
        let document = format::parse(&content)?;

        let mut session = Self::with_options(id, collaborators, options);
        session.state.query = document.query;
        session.state.results = document.results;
        session.state.is_persisted = true;
        session.state.file_path = Some(path.to_path_buf());
        session.regroup();
        session.status = SessionStatus::Ready;

        log_with_context(
            Level::Info,
            LogMessage::new("session", "Opened saved search")
                .with("file", path.display())
                .with("files", session.state.results.len()),
        );
        Ok(session)
    }

    pub fn state(&self) -> &SearchEditorState {
        &self.state
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn query(&self) -> &SearchQuery {
        &self.state.query
    }

    pub fn results(&self) -> &[SearchResultEntry] {
        &self.state.results
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_dirty(&self) -> bool {
        self.state.is_dirty
    }

    pub fn is_persisted(&self) -> bool {
        self.state.is_persisted
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.state.file_path.as_deref()
    }

    pub fn groups(&self) -> &FileGroupState {
        &self.groups
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Query of the search currently in flight, if any.
    pub fn pending_query(&self) -> Option<&SearchQuery> {
        self.pending.as_ref().map(|p| &p.query)
    }

    /// Starts a search for `query`, superseding any search in flight.
    pub fn begin_search(&mut self, query: SearchQuery) -> SearchTicket {
        let ticket = SearchTicket(self.next_ticket);
        self.next_ticket += 1;

        let resume = match self.pending.take() {
            Some(previous) => {
                log_with_context(
                    Level::Debug,
                    LogMessage::new("session", "Superseding search in flight")
                        .with("pattern", &previous.query.pattern),
                );
                previous.resume
            }
            None => self.status,
        };

        log_with_context(
            Level::Debug,
            LogMessage::new("session", "Search started")
                .with("id", &self.state.id)
                .with("pattern", &query.pattern),
        );
        self.pending = Some(PendingSearch {
            ticket,
            query,
            resume,
        });
        self.status = SessionStatus::Searching;
        ticket
    }

    /// Applies the results of the search identified by `ticket`.
    ///
    /// Results of a superseded search are dropped and reported as
    /// [`SearchOutcome::Discarded`].
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        entries: Vec<SearchResultEntry>,
    ) -> SearchOutcome {
        let Some(pending) = self.take_pending(ticket) else {
            log_with_context(
                Level::Debug,
                LogMessage::new("session", "Discarded stale search results")
                    .with("id", &self.state.id),
            );
            return SearchOutcome::Discarded;
        };

        self.state.query = pending.query;
        self.state.results = grouping::normalize_entries(entries);
        self.regroup();
        // A never-saved search is not dirty relative to nothing
        self.state.is_dirty = self.state.is_persisted || self.state.is_dirty;
        self.status = SessionStatus::Ready;

        log_with_context(
            Level::Debug,
            LogMessage::new("session", "Search completed")
                .with("id", &self.state.id)
                .with("files", self.state.results.len()),
        );
        SearchOutcome::Applied
    }

    /// Abandons the search identified by `ticket` after a provider failure.
    ///
    /// The session returns to the status it had before the search started
    /// and keeps its previous results.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SearchFailed`] when `ticket` is the current
    /// search. A stale ticket is discarded without error.
    pub fn fail_search(
        &mut self,
        ticket: SearchTicket,
        error: anyhow::Error,
    ) -> Result<SearchOutcome, SessionError> {
        match self.take_pending(ticket) {
            Some(pending) => {
                self.status = pending.resume;
                log_with_context(
                    Level::Warn,
                    LogMessage::new("session", format!("Search failed: {:#}", error))
                        .with("pattern", &pending.query.pattern),
                );
                Err(SessionError::search_failed(error))
            }
            None => Ok(SearchOutcome::Discarded),
        }
    }

    /// Runs `query` against `provider` to completion.
    pub fn run_search(
        &mut self,
        provider: &dyn SearchProvider,
        query: SearchQuery,
    ) -> Result<SearchOutcome, SessionError> {
        let ticket = self.begin_search(query.clone());
        match provider.search(&query) {
            Ok(entries) => Ok(self.complete_search(ticket, entries)),
            Err(e) => self.fail_search(ticket, e),
        }
    }

    /// Runs the current query again.
    pub fn rerun(&mut self, provider: &dyn SearchProvider) -> Result<SearchOutcome, SessionError> {
        self.run_search(provider, self.state.query.clone())
    }

    fn take_pending(&mut self, ticket: SearchTicket) -> Option<PendingSearch> {
        if self.pending.as_ref().is_some_and(|p| p.ticket == ticket) {
            self.pending.take()
        } else {
            None
        }
    }

    /// Removes every result.
    pub fn clear_results(&mut self) {
        if self.state.is_persisted || !self.state.results.is_empty() {
            self.state.is_dirty = true;
        }
        self.state.results.clear();
        self.regroup();
    }

    /// Saves the session through the content store.
    ///
    /// Returns the path written, or `None` when the save was cancelled. Flags
    /// only change after a confirmed save.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persistence`] when the store fails; the dirty
    /// and persisted flags are left as they were.
    pub fn save(&mut self) -> Result<Option<PathBuf>, SessionError> {
        let text = format::serialize(&self.state.query, &self.state.results);
        let suggested = self.suggested_filename();

        match self.collaborators.store.save_content(&text, &suggested) {
            Ok(Some(path)) => {
                log_with_context(
                    Level::Info,
                    LogMessage::new("session", "Saved search")
                        .with("file", path.display())
                        .with("bytes", text.len()),
                );
                self.state.is_dirty = false;
                self.state.is_persisted = true;
                self.state.file_path = Some(path.clone());
                Ok(Some(path))
            }
            Ok(None) => {
                log_with_context(
                    Level::Info,
                    LogMessage::new("session", "Save cancelled").with("suggested", &suggested),
                );
                Ok(None)
            }
            Err(e) => {
                log_with_context(
                    Level::Warn,
                    LogMessage::new("session", format!("Save failed: {:#}", e))
                        .with("suggested", &suggested),
                );
                Err(SessionError::persistence("save", e))
            }
        }
    }

    /// The file name offered when saving: the current file when persisted,
    /// otherwise one derived from the query pattern.
    pub fn suggested_filename(&self) -> String {
        self.state
            .file_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| format::generate_code_search_filename(&self.state.query.pattern))
    }

    /// Opens a match location in the editor.
    pub fn open_file(&mut self, path: &str, line: u64, column: Option<u64>) {
        self.collaborators
            .editor
            .open_file_at_location(path, line, column);
    }

    /// Copies the text of the line containing `m`.
    pub fn copy_match(&mut self, m: &SearchMatch) -> Result<(), SessionError> {
        self.write_clipboard("copy match", &m.text)
    }

    pub fn copy_file_path(&mut self, file: &str) -> Result<(), SessionError> {
        self.write_clipboard("copy file path", file)
    }

    /// Copies `results` rendered by [`render_results`].
    pub fn copy_all_results(
        &mut self,
        results: &[SearchResultEntry],
        options: &CopyOptions,
    ) -> Result<(), SessionError> {
        let text = render_results(results, options);
        self.write_clipboard("copy all results", &text)
    }

    fn write_clipboard(&mut self, operation: &'static str, text: &str) -> Result<(), SessionError> {
        self.collaborators.clipboard.write_text(text).map_err(|e| {
            log_with_context(
                Level::Warn,
                LogMessage::new("session", format!("Clipboard write failed: {:#}", e))
                    .with("operation", operation),
            );
            SessionError::persistence(operation, e)
        })
    }

    /// Whether `file` is currently expanded.
    pub fn is_expanded(&self, file: &str) -> bool {
        self.groups.is_expanded(file)
    }

    pub fn toggle_file(&mut self, file: &str) {
        self.groups = grouping::toggle(&self.groups, file);
    }

    pub fn expand_all(&mut self) {
        self.groups = grouping::expand_all(self.state.results.iter().map(|e| e.file.as_str()));
    }

    pub fn collapse_all(&mut self) {
        self.groups = grouping::collapse_all(self.state.results.iter().map(|e| e.file.as_str()));
    }

    fn regroup(&mut self) {
        self.groups = grouping::reconcile_with_threshold(
            &self.groups,
            &self.state.results,
            self.options.collapse_threshold,
        );
    }
}

/// Renders results as plain text: each file path on its own line followed
/// by its matches, with a blank line between files.
///
/// ```
/// use codesearch::model::{SearchMatch, SearchResultEntry};
/// use codesearch::session::{CopyOptions, render_results};
///
/// let results = vec![SearchResultEntry::new(
///     "src/lib.rs",
///     vec![SearchMatch::new(4, 8, "// TODO: document")],
/// )];
/// assert_eq!(
///     render_results(&results, &CopyOptions::default()),
///     "src/lib.rs\n  4: // TODO: document\n"
/// );
/// ```
pub fn render_results(results: &[SearchResultEntry], options: &CopyOptions) -> String {
    let root = options.strip_prefix.as_deref();
    results
        .iter()
        .filter(|entry| !entry.matches.is_empty())
        .map(|entry| {
            let mut block = display_path(&entry.file, root);
            block.push('\n');
            for m in &entry.matches {
                let location = if options.include_columns {
                    format!("{}:{}", m.line, m.column)
                } else {
                    m.line.to_string()
                };
                block.push_str(&format!("  {}: {}\n", location, m.text));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n")
}
