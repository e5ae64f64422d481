//! `[path]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [path]
//! src = "src/"     # source root
//! dist = "dist/"   # destination root
//! ```
//!
//! Relative paths resolve against the directory holding `brook.toml`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Source and destination roots.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// Source root every pipeline reads from.
    pub src: PathBuf,
    /// Destination root every pipeline writes to.
    pub dist: PathBuf,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src/"),
            dist: PathBuf::from("dist/"),
        }
    }
}

impl PathConfig {
    /// Validate normalized (absolute) roots.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.src.is_dir() {
            diag.error_with_hint(
                "path.src",
                format!("source root `{}` is not a directory", self.src.display()),
                "create it or point `path.src` at your sources",
            );
        }
        if self.src == self.dist {
            diag.error("path.dist", "destination root must differ from the source root");
        } else if self.dist.starts_with(&self.src) {
            diag.error_with_hint(
                "path.dist",
                "destination root must not live inside the source root",
                "built files would be picked up again as sources",
            );
        }
    }
}
