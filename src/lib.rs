//! # Codesearch
//!
//! The model behind a code-search results view: it takes per-line matches
//! from a search provider and keeps them grouped, highlighted and
//! persistable.
//!
//! ## Features
//!
//! * Highlighting - Split match lines around explicit or re-derived spans
//! * Grouping - Stable per-file ordering with sticky expand/collapse state
//! * Persistence - Save and restore sessions as `.code-search` files
//! * Sessions - Re-run, clear, save and copy with dirty tracking

/// Error types for patterns, parsing and session operations
pub mod error;
/// The `.code-search` file format
pub mod format;
/// Per-file grouping and expand/collapse reconciliation
pub mod grouping;
/// Match highlighting
pub mod highlight;
/// Queries, matches and result entries
pub mod model;
/// Path display helpers
pub mod paths;
/// Filesystem search provider
pub mod search;
/// The search session controller
pub mod session;
/// Filesystem and terminal collaborators
pub mod store;
/// Logging setup
pub mod telemetry;
