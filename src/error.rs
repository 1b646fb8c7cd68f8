//! Error types for pattern compilation, `.code-search` parsing and sessions.
//!
//! Nothing here is fatal to the host: pattern errors are recovered by the
//! highlighter, parse errors abort a load, and collaborator failures are
//! reported without touching session flags.

use thiserror::Error;

/// Boxed error produced by an external collaborator.
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A search pattern could not be compiled into a regular expression.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid search pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Malformed `.code-search` content.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing '# Query:' header")]
    MissingQuery,

    #[error("line {line}: match record appears before any file header")]
    OrphanMatch { line: usize },

    #[error("line {line}: malformed match record '{content}'")]
    InvalidMatch { line: usize, content: String },

    #[error("line {line}: unexpected content '{content}'")]
    UnexpectedLine { line: usize, content: String },

    #[error("line {line}: invalid escape sequence")]
    InvalidEscape { line: usize },

    #[error("line {line}: file '{file}' has no matches")]
    EmptyFile { line: usize, file: String },

    #[error(
        "summary declares {expected_results} results in {expected_files} files, \
         found {found_results} results in {found_files} files"
    )]
    CountMismatch {
        expected_results: usize,
        expected_files: usize,
        found_results: usize,
        found_files: usize,
    },
}

/// A non-fatal failure reported by the session controller.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to parse search file: {0}")]
    Parse(#[from] ParseError),

    #[error("{operation} failed: {source}")]
    Persistence {
        operation: &'static str,
        #[source]
        source: CollaboratorError,
    },

    #[error("search failed: {source}")]
    SearchFailed {
        #[source]
        source: CollaboratorError,
    },
}

impl SessionError {
    pub(crate) fn persistence(operation: &'static str, error: anyhow::Error) -> Self {
        SessionError::Persistence {
            operation,
            source: error.into(),
        }
    }

    pub(crate) fn search_failed(error: anyhow::Error) -> Self {
        SessionError::SearchFailed {
            source: error.into(),
        }
    }
}
