//! Lint report in stylelint's JSON formatter layout.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::lint::Violation;
use crate::config::LintLevel;

/// Lint outcome of one source file.
#[derive(Debug)]
pub struct FileResult {
    pub source: PathBuf,
    pub violations: Vec<Violation>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileEntry<'a> {
    source: String,
    deprecations: Vec<serde_json::Value>,
    invalid_option_warnings: Vec<serde_json::Value>,
    parse_errors: Vec<serde_json::Value>,
    errored: bool,
    warnings: Vec<WarningEntry<'a>>,
}

#[derive(Serialize)]
struct WarningEntry<'a> {
    line: usize,
    column: usize,
    rule: &'a str,
    severity: &'a str,
    text: &'a str,
}

/// Serialize `results` as a stylelint JSON report.
pub fn render(results: &[FileResult]) -> serde_json::Result<String> {
    let entries: Vec<FileEntry<'_>> = results
        .iter()
        .map(|result| FileEntry {
            source: result.source.display().to_string(),
            deprecations: Vec::new(),
            invalid_option_warnings: Vec::new(),
            parse_errors: Vec::new(),
            errored: result
                .violations
                .iter()
                .any(|v| v.severity == LintLevel::Error),
            warnings: result
                .violations
                .iter()
                .map(|v| WarningEntry {
                    line: v.line,
                    column: v.column,
                    rule: v.rule,
                    severity: v.severity.label(),
                    text: &v.text,
                })
                .collect(),
        })
        .collect();
    serde_json::to_string_pretty(&entries)
}

/// Write the report, creating parent directories.
pub fn write(path: &Path, results: &[FileResult]) -> Result<(), String> {
    let json = render(results).map_err(|e| e.to_string())?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| format!("{}: {e}", parent.display()))?;
    }
    fs::write(path, json).map_err(|e| format!("cannot write report `{}`: {e}", path.display()))
}
