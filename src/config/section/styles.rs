//! `[styles]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [styles]
//! enable = true
//! pattern = "**/*.scss"
//! browsers = ["defaults"]
//! sort = true
//!
//! [styles.lint]
//! enable = true
//! fix = true
//! fail_after_error = true
//! report = "report.json"
//! rules = { declaration-no-important = "warn" }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{LintLevel, RuleLevels};
use crate::config::ConfigDiagnostics;
use crate::config::util::check_glob;
use crate::pipeline::stage::style::{self, lint};

/// Style pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StylesConfig {
    pub enable: bool,

    /// Source glob, relative to `path.src`.
    pub pattern: String,

    /// Browserslist queries used for prefixing.
    pub browsers: Vec<String>,

    /// Sort declarations alphabetically inside each rule.
    pub sort: bool,

    pub lint: StyleLintConfig,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            enable: true,
            pattern: "**/*.scss".to_string(),
            browsers: vec!["defaults".to_string()],
            sort: true,
            lint: StyleLintConfig::default(),
        }
    }
}

/// `[styles.lint]`: lint-and-fix pass over the SCSS sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleLintConfig {
    pub enable: bool,

    /// Rewrite fixable violations in the source files.
    pub fix: bool,

    /// Fail the styles task when errors remain after fixing.
    pub fail_after_error: bool,

    /// Report destination. Relative paths resolve against the working directory.
    pub report: PathBuf,

    /// Violations at or above this level count as errors.
    pub fail_level: LintLevel,

    /// Per-rule severity overrides.
    pub rules: RuleLevels,
}

impl Default for StyleLintConfig {
    fn default() -> Self {
        Self {
            enable: true,
            fix: true,
            fail_after_error: true,
            report: PathBuf::from("report.json"),
            fail_level: LintLevel::Error,
            rules: RuleLevels::default(),
        }
    }
}

impl StylesConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        check_glob(diag, "styles.pattern", &self.pattern);
        if let Err(e) = style::parse_browsers(&self.browsers) {
            diag.error("styles.browsers", e);
        }
        if self.lint.fail_level == LintLevel::Off {
            diag.error("styles.lint.fail_level", "must be `warn` or `error`");
        }
        self.lint
            .rules
            .validate("styles.lint.rules", lint::RULE_NAMES, diag);
    }
}
