//! Glob selection of files under a source root.

use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use jwalk::WalkDir;

use crate::utils::path::rel_slash;

/// Marker prefix of style partials: imported, never emitted.
pub const PARTIAL_PREFIX: char = '_';

const IGNORED_FILES: &[&str] = &[".DS_Store", "Thumbs.db"];

/// Files under `root` matching one glob pattern.
///
/// Patterns use forward slashes relative to `root` and support brace
/// alternation (`**/*.{woff,woff2}`).
#[derive(Debug, Clone)]
pub struct FileMatcher {
    root: PathBuf,
    glob: GlobMatcher,
    skip_partials: bool,
}

impl FileMatcher {
    pub fn new(
        root: impl Into<PathBuf>,
        pattern: &str,
        skip_partials: bool,
    ) -> Result<Self, globset::Error> {
        Ok(Self {
            root: root.into(),
            glob: Glob::new(pattern)?.compile_matcher(),
            skip_partials,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `rel_path` (relative, forward slashes) would be yielded by [`files`].
    ///
    /// [`files`]: Self::files
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.glob.is_match(rel_path) {
            return false;
        }
        let name = rel_path.rsplit('/').next().unwrap_or(rel_path);
        if IGNORED_FILES.contains(&name) {
            return false;
        }
        !(self.skip_partials && name.starts_with(PARTIAL_PREFIX))
    }

    /// Matching files as relative, forward-slash paths, sorted.
    ///
    /// A missing root yields nothing. The walk happens at call time.
    pub fn files(&self) -> impl Iterator<Item = String> + use<> {
        let mut files: Vec<String> = if self.root.is_dir() {
            WalkDir::new(&self.root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| rel_slash(&e.path(), &self.root))
                .filter(|rel| self.matches(rel))
                .collect()
        } else {
            Vec::new()
        };
        files.sort();
        files.into_iter()
    }
}
