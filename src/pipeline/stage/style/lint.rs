//! Lint-and-fix over SCSS source text.
//!
//! | Rule                               | Default | Fixable |
//! |------------------------------------|---------|---------|
//! | `color-hex-case`                   | error   | yes     |
//! | `color-no-invalid-hex`             | error   |         |
//! | `block-no-empty`                   | error   |         |
//! | `no-eol-whitespace`                | error   | yes     |
//! | `max-empty-lines`                  | error   | yes     |
//! | `no-missing-end-of-source-newline` | error   | yes     |
//! | `length-zero-no-unit`              | error   | yes     |
//! | `declaration-no-important`         | off     |         |
//!
//! Only declaration values are checked for colors, units and `!important`.
//! A declaration is text ended by `;`, or text inside a block that does not
//! open a nested one. Comment lines are skipped.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::report::{self, FileResult};
use crate::asset::FileEvent;
use crate::config::{LintLevel, RuleLevels, section::StyleLintConfig};
use crate::log;
use crate::pipeline::StageError;
use crate::pipeline::stage::{Stage, line_col};
use crate::utils::plural::plural_count;

pub const RULE_NAMES: &[&str] = &[
    "color-hex-case",
    "color-no-invalid-hex",
    "block-no-empty",
    "no-eol-whitespace",
    "max-empty-lines",
    "no-missing-end-of-source-newline",
    "length-zero-no-unit",
    "declaration-no-important",
];

const DEFAULT_LEVELS: [LintLevel; 8] = [
    LintLevel::Error,
    LintLevel::Error,
    LintLevel::Error,
    LintLevel::Error,
    LintLevel::Error,
    LintLevel::Error,
    LintLevel::Error,
    LintLevel::Off,
];

static DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\w$-]+)\s*:\s*([^;{}]+)").unwrap());
static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"#([0-9A-Za-z]+)").unwrap());
static ZERO_LENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|[\s,(])(-?0+(?:\.0+)?)(px|em|rem|ex|ch|vw|vh|vmin|vmax|cm|mm|in|pt|pc)\b")
        .unwrap()
});
static IMPORTANT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!\s*important").unwrap());
static EMPTY_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\s*\}").unwrap());

/// One rule violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub line: usize,
    pub column: usize,
    pub rule: &'static str,
    pub severity: LintLevel,
    pub text: String,
}

/// Effective severity of every rule.
#[derive(Debug, Clone)]
pub struct Rules {
    levels: Vec<(&'static str, LintLevel)>,
}

impl Rules {
    pub fn new(overrides: &RuleLevels) -> Self {
        Self {
            levels: RULE_NAMES
                .iter()
                .zip(DEFAULT_LEVELS)
                .map(|(name, default)| (*name, overrides.level(name, default)))
                .collect(),
        }
    }

    fn level(&self, rule: &str) -> LintLevel {
        self.levels
            .iter()
            .find(|(name, _)| *name == rule)
            .map_or(LintLevel::Off, |(_, level)| *level)
    }

    fn on(&self, rule: &str) -> bool {
        self.level(rule) != LintLevel::Off
    }
}

// ============================================================================
// Line scanning
// ============================================================================

/// Source lines without the trailing empty piece after a final newline.
fn lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if text.ends_with('\n') {
        lines.pop();
    }
    lines
}

/// Whether `line` holds code, tracking `/* */` blocks across lines.
fn is_code_line(line: &str, in_block: &mut bool) -> bool {
    let trimmed = line.trim_start();
    if *in_block {
        if trimmed.contains("*/") {
            *in_block = false;
        }
        return false;
    }
    if trimmed.starts_with("//") {
        return false;
    }
    if trimmed.starts_with("/*") {
        *in_block = !trimmed.contains("*/");
        return false;
    }
    true
}

/// Brace depth carried from line to line.
#[derive(Debug, Default)]
struct Blocks {
    depth: usize,
}

impl Blocks {
    /// Byte ranges of the declarations on `line`. Selectors never qualify.
    fn declarations(&mut self, line: &str) -> Vec<Range<usize>> {
        let bytes = line.as_bytes();
        let mut out = Vec::new();
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                // `#{...}` interpolation does not open a block
                b'#' if bytes.get(i + 1) == Some(&b'{') => {
                    i = line[i..].find('}').map_or(bytes.len(), |end| i + end + 1);
                    continue;
                }
                b';' => {
                    out.push(start..i);
                    start = i + 1;
                }
                b'{' => {
                    self.depth += 1;
                    start = i + 1;
                }
                b'}' => {
                    if self.depth > 0 {
                        out.push(start..i);
                        self.depth -= 1;
                    }
                    start = i + 1;
                }
                _ => {}
            }
            i += 1;
        }
        // An open segment ending in `,` is part of a selector list.
        if self.depth > 0 && !line[start..].trim_end().ends_with(',') {
            out.push(start..line.len());
        }
        out
    }
}

fn is_valid_hex(digits: &str) -> bool {
    matches!(digits.len(), 3 | 4 | 6 | 8) && digits.chars().all(|c| c.is_ascii_hexdigit())
}

/// Zero lengths keep their unit in flex shorthands and custom properties.
fn allows_zero_unit(property: &str) -> bool {
    property.starts_with("flex") || property.starts_with("--")
}

// ============================================================================
// Lint
// ============================================================================

/// All violations in `text` for rules that are not `off`.
pub fn lint(text: &str, rules: &Rules) -> Vec<Violation> {
    let mut out = Vec::new();
    let mut push = |line: usize, column: usize, rule: &'static str, text: String| {
        let severity = rules.level(rule);
        if severity != LintLevel::Off {
            out.push(Violation {
                line,
                column,
                rule,
                severity,
                text: format!("{text} ({rule})"),
            });
        }
    };

    let mut in_block = false;
    let mut blocks = Blocks::default();
    let mut empty_run = 0;
    let source_lines = lines(text);

    for (idx, raw) in source_lines.iter().enumerate() {
        let line_no = idx + 1;
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if line.trim().is_empty() {
            empty_run += 1;
            if empty_run > 1 {
                push(line_no, 1, "max-empty-lines", "Expected no more than 1 empty line".into());
            }
        } else {
            empty_run = 0;
        }

        let trimmed_len = line.trim_end().len();
        if trimmed_len < line.len() {
            push(
                line_no,
                trimmed_len + 1,
                "no-eol-whitespace",
                "Unexpected whitespace at end of line".into(),
            );
        }

        if !is_code_line(line, &mut in_block) {
            continue;
        }

        for range in blocks.declarations(line) {
            for caps in DECLARATION.captures_iter(&line[range.clone()]) {
                let property = &caps[1];
                let Some(value) = caps.get(2) else { continue };
                let value_start = range.start + value.start();
                let value = value.as_str();

                if !value.contains("url(") {
                    for hex in HEX_COLOR.captures_iter(value) {
                        let whole = hex.get(0).map_or("", |m| m.as_str());
                        let digits = &hex[1];
                        let column = value_start + hex.get(0).map_or(0, |m| m.start()) + 1;
                        if !is_valid_hex(digits) {
                            let message = format!("Unexpected invalid hex color \"{whole}\"");
                            push(line_no, column, "color-no-invalid-hex", message);
                        } else if digits.chars().any(|c| c.is_ascii_uppercase()) {
                            let lower = whole.to_ascii_lowercase();
                            let message = format!("Expected \"{whole}\" to be \"{lower}\"");
                            push(line_no, column, "color-hex-case", message);
                        }
                    }
                }

                if !allows_zero_unit(property) {
                    for zero in ZERO_LENGTH.captures_iter(value) {
                        let column = value_start + zero.get(2).map_or(0, |m| m.start()) + 1;
                        push(line_no, column, "length-zero-no-unit", "Unexpected unit".into());
                    }
                }

                if let Some(m) = IMPORTANT.find(value) {
                    let column = value_start + m.start() + 1;
                    let message = "Unexpected !important".to_string();
                    push(line_no, column, "declaration-no-important", message);
                }
            }
        }
    }

    for m in EMPTY_BLOCK.find_iter(text) {
        if text[..m.start()].ends_with('#') {
            continue;
        }
        let (line, column) = line_col(text, m.start());
        push(line, column, "block-no-empty", "Unexpected empty block".into());
    }

    if !text.is_empty() && !text.ends_with('\n') {
        let line = source_lines.len();
        let column = source_lines.last().map_or(0, |l| l.chars().count()) + 1;
        let message = "Unexpected missing end-of-source newline".to_string();
        push(line, column, "no-missing-end-of-source-newline", message);
    }

    out.sort_by_key(|v| (v.line, v.column));
    out
}

// ============================================================================
// Fix
// ============================================================================

fn fix_value(property: &str, value: &str, rules: &Rules) -> String {
    let mut value = value.to_string();
    if rules.on("color-hex-case") && !value.contains("url(") {
        value = HEX_COLOR
            .replace_all(&value, |caps: &Captures<'_>| {
                if is_valid_hex(&caps[1]) {
                    caps[0].to_ascii_lowercase()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    if rules.on("length-zero-no-unit") && !allows_zero_unit(property) {
        value = ZERO_LENGTH.replace_all(&value, "${1}0").into_owned();
    }
    value
}

fn fix_declaration(segment: &str, rules: &Rules) -> String {
    DECLARATION
        .replace_all(segment, |caps: &Captures<'_>| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let start = caps.get(0).map_or(0, |m| m.start());
            let value_at = caps.get(2).map_or(whole.len(), |m| m.start()) - start;
            format!("{}{}", &whole[..value_at], fix_value(&caps[1], &caps[2], rules))
        })
        .into_owned()
}

fn fix_line(line: &str, blocks: &mut Blocks, rules: &Rules) -> String {
    let mut out = String::with_capacity(line.len());
    let mut copied = 0;
    for range in blocks.declarations(line) {
        out.push_str(&line[copied..range.start]);
        out.push_str(&fix_declaration(&line[range.clone()], rules));
        copied = range.end;
    }
    out.push_str(&line[copied..]);
    out
}

/// Apply every fixable rule that is not `off`.
pub fn fix(text: &str, rules: &Rules) -> String {
    let mut out = Vec::new();
    let mut in_block = false;
    let mut blocks = Blocks::default();
    let mut empty_run = 0;

    for raw in lines(text) {
        let (body, cr) = match raw.strip_suffix('\r') {
            Some(body) => (body, "\r"),
            None => (raw, ""),
        };

        let mut line = if is_code_line(body, &mut in_block) {
            fix_line(body, &mut blocks, rules)
        } else {
            body.to_string()
        };
        if rules.on("no-eol-whitespace") {
            line.truncate(line.trim_end().len());
        }

        if line.trim().is_empty() {
            empty_run += 1;
            if empty_run > 1 && rules.on("max-empty-lines") {
                continue;
            }
        } else {
            empty_run = 0;
        }

        out.push(format!("{line}{cr}"));
    }

    let mut fixed = out.join("\n");
    let newline = text.ends_with('\n') || rules.on("no-missing-end-of-source-newline");
    if !fixed.is_empty() && newline {
        fixed.push('\n');
    }
    fixed
}

// ============================================================================
// Stage
// ============================================================================

/// Lint SCSS sources, emit fixed files, always write the report on flush.
pub struct StyleLint {
    src_root: PathBuf,
    rules: Rules,
    fix: bool,
    fail_after_error: bool,
    fail_level: LintLevel,
    report_path: PathBuf,
    results: Vec<FileResult>,
}

impl StyleLint {
    pub fn new(src_root: impl Into<PathBuf>, config: &StyleLintConfig) -> Self {
        Self {
            src_root: src_root.into(),
            rules: Rules::new(&config.rules),
            fix: config.fix,
            fail_after_error: config.fail_after_error,
            fail_level: config.fail_level,
            report_path: config.report.clone(),
            results: Vec::new(),
        }
    }
}

impl Stage for StyleLint {
    fn name(&self) -> &'static str {
        "stylelint"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let text = event
            .text()
            .map_err(|e| StageError::Recoverable(format!("not valid UTF-8: {e}")))?;

        let fixed = if self.fix {
            fix(text, &self.rules)
        } else {
            text.to_string()
        };
        let changed = fixed != text;
        let violations = lint(&fixed, &self.rules);

        for v in &violations {
            log!(
                "lint";
                "{}:{}:{} {} {}",
                event.path, v.line, v.column, v.severity.label(), v.text
            );
        }
        self.results.push(FileResult {
            source: self.src_root.join(&event.path),
            violations,
        });

        if changed {
            log!("lint"; "fixed {}", event.path);
            Ok(vec![event.with_contents(fixed)])
        } else {
            Ok(Vec::new())
        }
    }

    fn flush(&mut self) -> Result<(), StageError> {
        report::write(&self.report_path, &self.results).map_err(StageError::Fatal)?;

        let failing = self
            .results
            .iter()
            .flat_map(|r| &r.violations)
            .filter(|v| v.severity >= self.fail_level)
            .count();
        if self.fail_after_error && failing > 0 {
            return Err(StageError::Fatal(format!(
                "{} remaining, see {}",
                plural_count(failing, "lint error"),
                self.report_path.display()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;
    use tempfile::TempDir;

    fn default_rules() -> Rules {
        Rules::new(&RuleLevels::default())
    }

    fn rule_names(text: &str) -> Vec<&'static str> {
        lint(text, &default_rules()).into_iter().map(|v| v.rule).collect()
    }

    #[test]
    fn test_clean_source() {
        assert!(rule_names(".a {\n  color: #fff;\n  margin: 0 10px;\n}\n").is_empty());
    }

    #[test]
    fn test_hex_rules() {
        assert_eq!(rule_names(".a {\n  color: #FFF;\n}\n"), ["color-hex-case"]);
        assert_eq!(rule_names(".a {\n  color: #ff;\n}\n"), ["color-no-invalid-hex"]);
        assert_eq!(rule_names(".a {\n  color: #ggg;\n}\n"), ["color-no-invalid-hex"]);
        // Selectors and interpolation are not values.
        assert!(rule_names("#Header {\n  color: #{$c};\n}\n").is_empty());
    }

    #[test]
    fn test_selectors_are_not_declarations() {
        assert!(rule_names(".menu:hover #dropdown {\n  color: red;\n}\n").is_empty());
        assert!(rule_names("a:not(#Main) {\n  color: red;\n}\n").is_empty());
        // nested selectors and one-line rules
        let nested = ".nav {\n  &:hover #Bad {\n    color: #FFF;\n  }\n}\n";
        assert_eq!(rule_names(nested), ["color-hex-case"]);
        assert_eq!(rule_names(".a:hover #x { color: #FFF; }\n"), ["color-hex-case"]);
        // top-level variables are still declarations
        assert_eq!(rule_names("$brand: #ABC;\n"), ["color-hex-case"]);
    }

    #[test]
    fn test_fix_keeps_selectors() {
        let source = ".nav:hover #Bad {\n  color: #FFF;\n  &:focus #Ace { margin: 0px; }\n}\n";
        assert_eq!(
            fix(source, &default_rules()),
            ".nav:hover #Bad {\n  color: #fff;\n  &:focus #Ace { margin: 0; }\n}\n"
        );
    }

    #[test]
    fn test_violation_position() {
        let violations = lint(".a {\n  color: #FFF;\n}\n", &default_rules());
        assert_eq!((violations[0].line, violations[0].column), (2, 10));
        assert_eq!(
            violations[0].text,
            "Expected \"#FFF\" to be \"#fff\" (color-hex-case)"
        );
    }

    #[test]
    fn test_whitespace_rules() {
        let names = rule_names(".a {\n  color: red;  \n}\n\n\n.b {\n  color: blue;\n}");
        assert_eq!(
            names,
            [
                "no-eol-whitespace",
                "max-empty-lines",
                "no-missing-end-of-source-newline"
            ]
        );
    }

    #[test]
    fn test_zero_units_and_empty_block() {
        let names = rule_names(".a {\n  margin: 0px 10px -0em;\n  flex: 1 1 0px;\n}\n.b {}\n");
        assert_eq!(
            names,
            ["length-zero-no-unit", "length-zero-no-unit", "block-no-empty"]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let source = "// color: #FFF;\n/*\n  color: #ABC;\n*/\n.a {\n  color: red;\n}\n";
        assert!(rule_names(source).is_empty());
    }

    #[test]
    fn test_fix_all() {
        let source =
            ".a {\n  color: #ABCDEF;  \n  margin: 0px auto;\n}\n\n\n\n.b {\n  color: red;\n}";
        let fixed = fix(source, &default_rules());
        assert_eq!(
            fixed,
            ".a {\n  color: #abcdef;\n  margin: 0 auto;\n}\n\n.b {\n  color: red;\n}\n"
        );
        assert!(lint(&fixed, &default_rules()).is_empty());
    }

    #[test]
    fn test_fix_leaves_invalid_hex() {
        let fixed = fix(".a {\n  color: #FFFF1;\n}\n", &default_rules());
        assert_eq!(fixed, ".a {\n  color: #FFFF1;\n}\n");
    }

    #[test]
    fn test_important_opt_in() {
        let source = ".a {\n  color: red !important;\n}\n";
        assert!(rule_names(source).is_empty());

        let config = test_parse_config("[styles.lint.rules]\ndeclaration-no-important = \"warn\"");
        let rules = Rules::new(&config.styles.lint.rules);
        let violations = lint(source, &rules);
        assert_eq!(violations[0].rule, "declaration-no-important");
        assert_eq!(violations[0].severity, LintLevel::Warn);
    }

    #[test]
    fn test_stage_emits_only_fixed_files() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("");
        config.styles.lint.report = dir.path().join("report.json");
        let mut stage = StyleLint::new(dir.path(), &config.styles.lint);

        let clean = stage
            .process(FileEvent::new("a.scss", ".a {\n  color: red;\n}\n"))
            .unwrap();
        assert!(clean.is_empty());

        let fixed = stage
            .process(FileEvent::new("b.scss", ".b {\n  color: #FFF;\n}\n"))
            .unwrap();
        assert_eq!(fixed[0].text().unwrap(), ".b {\n  color: #fff;\n}\n");

        stage.flush().unwrap();
        assert!(dir.path().join("report.json").exists());
    }

    #[test]
    fn test_stage_fails_after_writing_report() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("");
        config.styles.lint.report = dir.path().join("report.json");
        let mut stage = StyleLint::new(dir.path(), &config.styles.lint);

        stage
            .process(FileEvent::new("a.scss", ".a {}\n"))
            .unwrap();
        assert!(matches!(stage.flush(), Err(StageError::Fatal(_))));
        let report = std::fs::read_to_string(dir.path().join("report.json")).unwrap();
        assert!(report.contains("block-no-empty"));
    }

    #[test]
    fn test_stage_fail_after_error_disabled() {
        let dir = TempDir::new().unwrap();
        let mut config = test_parse_config("[styles.lint]\nfail_after_error = false");
        config.styles.lint.report = dir.path().join("report.json");
        let mut stage = StyleLint::new(dir.path(), &config.styles.lint);

        stage.process(FileEvent::new("a.scss", ".a {}\n")).unwrap();
        assert!(stage.flush().is_ok());
    }
}
