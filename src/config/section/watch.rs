//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! debounce_ms = 300                     # quiescence window before a rebuild
//! reload = ["**/*.php", "**/*.html"]    # changes that only reload browsers
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;
use crate::config::util::check_glob;

/// Watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiescence delay coalescing rapid successive writes.
    pub debounce_ms: u64,

    /// Globs (relative to the source root) that trigger a reload without a rebuild.
    pub reload: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 300,
            reload: vec!["**/*.php".to_string(), "**/*.html".to_string()],
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for pattern in &self.reload {
            check_glob(diag, "watch.reload", pattern);
        }
    }
}
