//! Static analysis over the oxc semantic model.
//!
//! | Rule          | Default | Flags                                  |
//! |---------------|---------|----------------------------------------|
//! | `no-debugger` | error   | `debugger` statements                  |
//! | `no-console`  | warn    | calls on `console`                     |
//! | `eqeqeq`      | off     | `==` and `!=`                          |
//! | `no-var`      | off     | `var` declarations                     |
//! | `no-alert`    | off     | `alert()`, `confirm()`, `prompt()`     |

use oxc::allocator::Allocator;
use oxc::ast::AstKind;
use oxc::ast::ast::{Expression, VariableDeclarationKind};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::GetSpan;
use oxc::syntax::operator::BinaryOperator;

use super::{source_type, utf8};
use crate::asset::FileEvent;
use crate::config::{LintLevel, RuleLevels, section::ScriptLintConfig};
use crate::log;
use crate::pipeline::StageError;
use crate::pipeline::stage::{Stage, line_col};
use crate::utils::plural::plural_count;

pub const RULE_NAMES: &[&str] = &["no-debugger", "no-console", "eqeqeq", "no-var", "no-alert"];

const DEFAULT_LEVELS: [LintLevel; 5] = [
    LintLevel::Error,
    LintLevel::Warn,
    LintLevel::Off,
    LintLevel::Off,
    LintLevel::Off,
];

struct Finding {
    rule: &'static str,
    offset: u32,
    message: String,
}

/// Lint scripts; fail on flush when a violation reaches `fail_level`.
pub struct Check {
    levels: Vec<(&'static str, LintLevel)>,
    fail_level: LintLevel,
    failing: usize,
}

impl Check {
    pub fn new(config: &ScriptLintConfig) -> Self {
        Self {
            levels: resolve_levels(&config.rules),
            fail_level: config.fail_level,
            failing: 0,
        }
    }

    fn level(&self, rule: &str) -> LintLevel {
        self.levels
            .iter()
            .find(|(name, _)| *name == rule)
            .map_or(LintLevel::Off, |(_, level)| *level)
    }
}

fn resolve_levels(rules: &RuleLevels) -> Vec<(&'static str, LintLevel)> {
    RULE_NAMES
        .iter()
        .zip(DEFAULT_LEVELS)
        .map(|(name, default)| (*name, rules.level(name, default)))
        .collect()
}

impl Stage for Check {
    fn name(&self) -> &'static str {
        "check"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let source = utf8(&event)?;
        let findings = find(source).map_err(StageError::Fatal)?;

        for finding in findings {
            let level = self.level(finding.rule);
            if level == LintLevel::Off {
                continue;
            }
            let (line, col) = line_col(source, finding.offset as usize);
            log!(
                "lint";
                "{}:{}:{} {} {} {}",
                event.path, line, col, level.label(), finding.rule, finding.message
            );
            if level >= self.fail_level {
                self.failing += 1;
            }
        }
        Ok(vec![event])
    }

    fn flush(&mut self) -> Result<(), StageError> {
        if self.failing > 0 {
            return Err(StageError::Fatal(format!(
                "{} at or above `{}`",
                plural_count(self.failing, "problem"),
                self.fail_level.label()
            )));
        }
        Ok(())
    }
}

/// Every rule match in `source`, in source order. Errors on invalid syntax.
fn find(source: &str) -> Result<Vec<Finding>, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(err.to_string());
    }

    let semantic = SemanticBuilder::new().build(&ret.program).semantic;
    let mut findings = Vec::new();

    for node in semantic.nodes().iter() {
        let kind = node.kind();
        let found = match kind {
            AstKind::DebuggerStatement(_) => {
                Some(("no-debugger", "Unexpected 'debugger' statement.".to_string()))
            }
            AstKind::CallExpression(call) => check_callee(&call.callee),
            AstKind::BinaryExpression(bin) => match bin.operator {
                BinaryOperator::Equality => {
                    Some(("eqeqeq", "Expected '===' and instead saw '=='.".to_string()))
                }
                BinaryOperator::Inequality => {
                    Some(("eqeqeq", "Expected '!==' and instead saw '!='.".to_string()))
                }
                _ => None,
            },
            AstKind::VariableDeclaration(decl) if decl.kind == VariableDeclarationKind::Var => {
                Some(("no-var", "Unexpected var, use let or const instead.".to_string()))
            }
            _ => None,
        };

        if let Some((rule, message)) = found {
            findings.push(Finding {
                rule,
                offset: kind.span().start,
                message,
            });
        }
    }

    findings.sort_by_key(|f| f.offset);
    Ok(findings)
}

fn check_callee(callee: &Expression<'_>) -> Option<(&'static str, String)> {
    if let Expression::Identifier(ident) = callee {
        let name = ident.name.as_str();
        return matches!(name, "alert" | "confirm" | "prompt")
            .then(|| ("no-alert", format!("Unexpected {name}.")));
    }

    let member = callee.as_member_expression()?;
    match member.object() {
        Expression::Identifier(ident) if ident.name.as_str() == "console" => {
            Some(("no-console", "Unexpected console statement.".to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    fn rules(source: &str) -> Vec<&'static str> {
        find(source).unwrap().into_iter().map(|f| f.rule).collect()
    }

    #[test]
    fn test_find_rules() {
        let source = "var a = 1;\nif (a == 2) { debugger; }\nconsole.log(a);\nalert('x');\n";
        assert_eq!(
            rules(source),
            ["no-var", "eqeqeq", "no-debugger", "no-console", "no-alert"]
        );
    }

    #[test]
    fn test_find_clean_source() {
        assert!(rules("const a = 1;\nif (a === 2) { window.go(a); }\n").is_empty());
    }

    #[test]
    fn test_find_syntax_error() {
        assert!(find("const = ;").is_err());
    }

    #[test]
    fn test_default_levels() {
        let config = test_parse_config("");
        let mut check = Check::new(&config.scripts.lint);
        check
            .process(FileEvent::new("a.es6", "console.log(1);\nvar x = 1;\n"))
            .unwrap();
        assert!(check.flush().is_ok());

        check.process(FileEvent::new("b.es6", "debugger;\n")).unwrap();
        assert!(matches!(check.flush(), Err(StageError::Fatal(_))));
    }

    #[test]
    fn test_fail_level_warn() {
        let config = test_parse_config("[scripts.lint]\nfail_level = \"warn\"");
        let mut check = Check::new(&config.scripts.lint);
        check
            .process(FileEvent::new("a.es6", "console.info('x');\n"))
            .unwrap();
        assert!(check.flush().is_err());
    }

    #[test]
    fn test_rule_override_off() {
        let config = test_parse_config("[scripts.lint.rules]\nno-debugger = \"off\"");
        let mut check = Check::new(&config.scripts.lint);
        check.process(FileEvent::new("a.es6", "debugger;\n")).unwrap();
        assert!(check.flush().is_ok());
    }
}
