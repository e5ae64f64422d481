//! Path normalization utilities.
//!
//! - `normalize_path` - file system paths (canonicalize + fallback)
//! - `to_slash` - relative path with forward slashes
//! - `rel_slash` - path relative to a root, with forward slashes

use std::path::{Component, Path, PathBuf};

/// Normalize a file system path to absolute form.
///
/// Tries `canonicalize()` first (resolves symlinks, `.`, `..`).
/// Falls back to:
/// - Return as-is if already absolute
/// - Join with current directory if relative
///
/// # Example
/// ```ignore
/// use brook::utils::path::normalize_path;
/// let abs = normalize_path(Path::new("./src/scss"));
/// ```
#[inline]
pub fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir().map_or_else(|_| path.to_path_buf(), |cwd| cwd.join(path))
        }
    })
}

/// Join the normal components of `path` with `/`.
///
/// Glob matching and `FileEvent` paths always use forward slashes,
/// whatever the platform separator.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// `path` relative to `root` with forward slashes, or `None` outside `root`.
pub fn rel_slash(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(to_slash)
}
