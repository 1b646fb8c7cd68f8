//! Collaborators backed by the local machine.
//!
//! [`FileStore`] saves and loads `.code-search` files on disk,
//! [`StdoutClipboard`] stands in for a clipboard in terminal use and
//! [`LoggingEditor`] records open requests in the log.

use anyhow::{Context, Result};
use log::Level;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::format::CODE_SEARCH_EXTENSION;
use crate::session::{Clipboard, Collaborators, ContentStore, EditorOpener};
use crate::telemetry::{LogMessage, log_with_context};

/// Where [`FileStore`] writes saved searches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveTarget {
    /// Save under the suggested filename inside this directory
    Directory(PathBuf),
    /// Always save to this path, ignoring the suggestion
    File(PathBuf),
}

/// Saves `.code-search` content to the filesystem.
#[derive(Debug, Clone)]
pub struct FileStore {
    target: SaveTarget,
}

impl FileStore {
    pub fn in_directory(dir: impl Into<PathBuf>) -> Self {
        Self {
            target: SaveTarget::Directory(dir.into()),
        }
    }

    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            target: SaveTarget::File(path.into()),
        }
    }

    pub fn target(&self) -> &SaveTarget {
        &self.target
    }

    fn destination(&self, suggested_filename: &str) -> PathBuf {
        match &self.target {
            SaveTarget::Directory(dir) => dir.join(suggested_filename),
            SaveTarget::File(path) => with_code_search_extension(path),
        }
    }
}

impl ContentStore for FileStore {
    fn save_content(&mut self, text: &str, suggested_filename: &str) -> Result<Option<PathBuf>> {
        let path = self.destination(suggested_filename);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, text).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(Some(path))
    }

    fn load_content(&mut self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

/// Appends `.code-search` unless `path` already has that extension.
pub fn with_code_search_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == CODE_SEARCH_EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(CODE_SEARCH_EXTENSION);
    PathBuf::from(name)
}

/// Writes "copied" text to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .context("Failed to write to stdout")
    }
}

/// Logs open requests instead of opening an editor.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEditor;

impl EditorOpener for LoggingEditor {
    fn open_file_at_location(&mut self, path: &str, line: u64, column: Option<u64>) {
        log_with_context(
            Level::Info,
            LogMessage::new("editor", "Open requested")
                .with("path", path)
                .with("line", line)
                .with("column", column.unwrap_or(1)),
        );
    }
}

/// Collaborators for terminal use around `store`.
pub fn terminal_collaborators(store: FileStore) -> Collaborators {
    Collaborators {
        editor: Box::new(LoggingEditor),
        store: Box::new(store),
        clipboard: Box::new(StdoutClipboard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_into_directory() -> Result<()> {
        let dir = tempdir()?;
        let mut store = FileStore::in_directory(dir.path().join("searches"));

        let saved = store.save_content("# Query: a\n", "a.code-search")?;
        let path = saved.unwrap();
        assert_eq!(path, dir.path().join("searches/a.code-search"));
        assert_eq!(store.load_content(&path)?, "# Query: a\n");
        Ok(())
    }

    #[test]
    fn test_save_to_file_appends_extension() -> Result<()> {
        let dir = tempdir()?;
        let mut store = FileStore::to_file(dir.path().join("todo"));

        let path = store.save_content("# Query: b\n", "ignored.code-search")?.unwrap();
        assert_eq!(path, dir.path().join("todo.code-search"));
        assert!(path.exists());
        Ok(())
    }

    #[test]
    fn test_with_code_search_extension() {
        assert_eq!(
            with_code_search_extension(Path::new("a.code-search")),
            PathBuf::from("a.code-search")
        );
        assert_eq!(
            with_code_search_extension(Path::new("notes.txt")),
            PathBuf::from("notes.txt.code-search")
        );
    }

    #[test]
    fn test_load_missing_file_fails() {
        let mut store = FileStore::in_directory(".");
        assert!(store.load_content(Path::new("/does/not/exist.code-search")).is_err());
    }
}
