//! Path helpers for displaying result files.
//!
//! Only simple prefix stripping is supported: a result path under the search
//! root is shown relative to it, anything else is shown unchanged.

use std::path::{MAIN_SEPARATOR, Path, PathBuf};

/// Removes `prefix` from `path` when `path` starts with it.
///
/// Matching is done per path component, so `/home/username` does not start
/// with `/home/user`.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use codesearch::paths::remove_path_prefix;
///
/// let path = Path::new("/work/repo/src/main.rs");
/// assert_eq!(remove_path_prefix(path, "/work/repo"), PathBuf::from("src/main.rs"));
/// assert_eq!(remove_path_prefix(path, "/tmp"), path);
/// ```
pub fn remove_path_prefix<P: AsRef<Path>, Q: AsRef<Path>>(path: P, prefix: Q) -> PathBuf {
    let path = path.as_ref();
    path.strip_prefix(prefix.as_ref())
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Renders `file` for display, relative to `root` when it lies under it.
///
/// Separators are normalised to `/` so saved searches are stable across
/// platforms.
///
/// # Arguments
///
/// * `file` - Path as reported by the search provider
/// * `root` - Directory to show paths relative to, if any
///
/// # Returns
///
/// The path with `root` stripped when it was a prefix, using `/` separators.
pub fn display_path(file: &str, root: Option<&Path>) -> String {
    let shown = match root {
        Some(root) => remove_path_prefix(file, root),
        None => PathBuf::from(file),
    };
    to_slash(&shown)
}

/// Renders `path` with `/` separators on every platform.
pub fn to_slash(path: &Path) -> String {
    let shown = path.to_string_lossy();
    if MAIN_SEPARATOR == '/' {
        shown.into_owned()
    } else {
        shown.replace(MAIN_SEPARATOR, "/")
    }
}
