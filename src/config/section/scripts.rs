//! `[scripts]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [scripts]
//! enable = true
//! pattern = "**/*.es6"
//! target = "es2015"
//! minify = true
//!
//! [scripts.lint]
//! fail_level = "error"
//! rules = { no-console = "off" }
//! ```

use serde::{Deserialize, Serialize};

use super::{LintLevel, RuleLevels};
use crate::config::ConfigDiagnostics;
use crate::config::util::check_glob;
use crate::pipeline::stage::script;

/// Script pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    pub enable: bool,

    /// Source glob, relative to `path.src`.
    pub pattern: String,

    /// Lowering target handed to the transformer (`es2015` ... `es2024`, `esnext`).
    pub target: String,

    /// Run the minifier after transpiling.
    pub minify: bool,

    pub lint: ScriptLintConfig,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            enable: true,
            pattern: "**/*.es6".to_string(),
            target: "es2015".to_string(),
            minify: true,
            lint: ScriptLintConfig::default(),
        }
    }
}

/// `[scripts.lint]`: static analysis run before transpiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLintConfig {
    /// Violations at or above this level fail the task.
    pub fail_level: LintLevel,

    /// Per-rule severity overrides.
    pub rules: RuleLevels,
}

impl Default for ScriptLintConfig {
    fn default() -> Self {
        Self {
            fail_level: LintLevel::Error,
            rules: RuleLevels::default(),
        }
    }
}

impl ScriptsConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        check_glob(diag, "scripts.pattern", &self.pattern);
        if let Err(e) = script::parse_target(&self.target) {
            diag.error_with_hint(
                "scripts.target",
                format!("invalid target `{}`: {e}", self.target),
                "use an ECMAScript version such as `es2015` or `esnext`",
            );
        }
        if self.lint.fail_level == LintLevel::Off {
            diag.error("scripts.lint.fail_level", "must be `warn` or `error`");
        }
        self.lint
            .rules
            .validate("scripts.lint.rules", script::RULE_NAMES, diag);
    }
}
