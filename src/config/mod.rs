//! Project configuration management for `brook.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── path       # [path]
//! │   ├── serve      # [serve]
//! │   ├── watch      # [watch]
//! │   ├── scripts    # [scripts] + [scripts.lint]
//! │   ├── styles     # [styles] + [styles.lint]
//! │   ├── images     # [images]
//! │   └── fonts      # [fonts]
//! ├── types/         # ConfigError, ConfigDiagnostics
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! The configuration is loaded once at startup and shared as
//! `Arc<ProjectConfig>`. Nothing reads it through a global.

pub mod section;
pub mod types;
mod util;

pub use section::{
    FontsConfig, ImagesConfig, LintLevel, PathConfig, RuleLevels, ScriptsConfig, ServeConfig,
    StylesConfig, WatchConfig,
};
pub use types::{ConfigDiagnostics, ConfigError};

use util::{check_proxy_url, expand_path, find_config_file};

use crate::cli::{Cli, ServeArgs};
use crate::log;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing brook.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Proxy target for the dev server. `None` serves `path.dist` directly.
    pub localhost: Option<String>,

    pub path: PathConfig,
    pub serve: ServeConfig,
    pub watch: WatchConfig,
    pub scripts: ScriptsConfig,
    pub styles: StylesConfig,
    pub images: ImagesConfig,
    pub fonts: FontsConfig,
}

impl ProjectConfig {
    /// Load configuration for the given CLI invocation.
    ///
    /// Searches upward from cwd for the config file. Without one, defaults
    /// rooted at cwd are used.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut config = match find_config_file(&cli.config) {
            Some(path) => Self::from_path(&path)?,
            None => {
                let cwd = std::env::current_dir()
                    .context("Failed to get current working directory")?;
                log!("warn"; "no {} found, using defaults", cli.config.display());
                let mut config = Self::default();
                config.finalize(&cwd);
                config
            }
        };

        if let Some(args) = cli.serve_args() {
            config.apply_serve_args(&args);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (mut config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        let path = crate::utils::path::normalize_path(path);
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        config.config_path = path;
        config.finalize(&root);
        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warn"; "unknown fields in {}, ignoring: {}", display_path, fields.join(", "));
    }

    /// Source root every pipeline reads from.
    pub fn src(&self) -> &Path {
        &self.path.src
    }

    /// Destination root every pipeline writes to.
    pub fn dist(&self) -> &Path {
        &self.path.dist
    }

    /// Proxy target, if the dev server should forward requests.
    pub fn proxy_target(&self) -> Option<&str> {
        self.localhost.as_deref().filter(|s| !s.trim().is_empty())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply `default` command overrides.
    pub fn apply_serve_args(&mut self, args: &ServeArgs) {
        Self::update_option(&mut self.serve.interface, args.interface.as_ref());
        Self::update_option(&mut self.serve.port, args.port.as_ref());
        if let Some(proxy) = &args.proxy {
            self.localhost = Some(proxy.clone());
        }
        if args.no_proxy {
            self.localhost = None;
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Resolve `[path]` roots against the project root.
    fn finalize(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);
        self.path.src = crate::utils::path::normalize_path(&expand_path(&self.path.src, &root));
        self.path.dist = crate::utils::path::normalize_path(&expand_path(&self.path.dist, &root));
        // The lint report stays relative to the working directory.
        self.styles.lint.report = expand_path(&self.styles.lint.report, Path::new(""));
        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate the normalized configuration.
    ///
    /// Collects all validation errors and returns them at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut diag = ConfigDiagnostics::new();

        self.path.validate(&mut diag);
        if let Some(url) = self.proxy_target()
            && let Err(message) = check_proxy_url(url)
        {
            diag.error_with_hint(
                "localhost",
                message,
                "e.g. localhost = \"http://localhost:8080\"",
            );
        }
        self.serve.validate(&mut diag);
        self.watch.validate(&mut diag);
        self.scripts.validate(&mut diag);
        self.styles.validate(&mut diag);
        self.images.validate(&mut diag);
        self.fonts.validate(&mut diag);

        diag.into_result().map_err(ConfigError::Diagnostics)
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config text as-is, without path normalization.
/// Panics if there are unknown fields (to catch config typos in tests).
#[cfg(test)]
pub fn test_parse_config(extra: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(extra).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Config rooted at `root`, with `root/src` and `root/dist` as roots.
#[cfg(test)]
pub fn test_project_config(root: &Path, extra: &str) -> ProjectConfig {
    let mut config = test_parse_config(extra);
    config.finalize(root);
    config
}

// ============================================================================
// tests
// ============================================================================
