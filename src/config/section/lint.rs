//! Lint severities shared by `[scripts.lint]` and `[styles.lint]`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Severity of a lint rule.
///
/// Ordered so that `level >= fail_level` answers "does this fail the run".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LintLevel {
    Off,
    #[serde(alias = "warning")]
    Warn,
    #[default]
    Error,
}

impl LintLevel {
    /// Label used in console output and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Warn => "warning",
            Self::Error => "error",
        }
    }
}

/// Per-rule severity overrides, keyed by rule name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleLevels(BTreeMap<String, LintLevel>);

impl RuleLevels {
    /// Effective level of `rule`, falling back to its built-in default.
    pub fn level(&self, rule: &str, default: LintLevel) -> LintLevel {
        self.0.get(rule).copied().unwrap_or(default)
    }

    /// Report overrides naming a rule that does not exist.
    pub fn validate(&self, field: &str, known: &[&str], diag: &mut ConfigDiagnostics) {
        for name in self.0.keys() {
            if !known.contains(&name.as_str()) {
                diag.error_with_hint(
                    field,
                    format!("unknown rule `{name}`"),
                    format!("known rules: {}", known.join(", ")),
                );
            }
        }
    }

    #[cfg(test)]
    pub fn set(&mut self, rule: &str, level: LintLevel) {
        self.0.insert(rule.to_string(), level);
    }
}
