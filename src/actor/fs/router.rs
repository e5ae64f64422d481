//! Watch rules and change routing.
//!
//! Every change maps to at most one rule: the first whose glob matches the
//! path relative to the source root. Asset classes come first, in
//! [`AssetClass::ALL`] order, then the reload-only globs.

use std::fmt;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::actor::messages::Trigger;
use crate::asset::FileMatcher;
use crate::config::ProjectConfig;
use crate::pipeline::AssetClass;
use crate::utils::path::rel_slash;

/// What a rule does once its changes settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    /// Rebuild one asset class, then reload.
    Task(AssetClass),
    /// Reload without rebuilding.
    Reload,
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task(class) => f.write_str(class.as_str()),
            Self::Reload => f.write_str("reload"),
        }
    }
}

/// `{glob, action}` pair, built once at watch start.
#[derive(Debug, Clone)]
pub struct WatchRule {
    matcher: FileMatcher,
    pub pattern: String,
    pub action: RuleAction,
}

impl WatchRule {
    fn new(src: &Path, pattern: &str, action: RuleAction) -> Result<Self, globset::Error> {
        Ok(Self {
            matcher: FileMatcher::new(src, pattern, false)?,
            pattern: pattern.to_string(),
            action,
        })
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.matches(rel_path)
    }
}

/// Rules for every enabled asset class plus the reload-only globs.
pub fn build_rules(config: &ProjectConfig) -> Result<Vec<WatchRule>, globset::Error> {
    let src = config.src();
    let mut rules = Vec::new();
    for class in AssetClass::ALL {
        if class.enabled(config) {
            rules.push(WatchRule::new(src, class.pattern(config), RuleAction::Task(class))?);
        }
    }
    for pattern in &config.watch.reload {
        rules.push(WatchRule::new(src, pattern, RuleAction::Reload)?);
    }
    Ok(rules)
}

/// Maps absolute change paths to rule indices.
pub(super) struct Router {
    src: PathBuf,
    dist: PathBuf,
    rules: Vec<WatchRule>,
}

impl Router {
    pub(super) fn new(src: PathBuf, dist: PathBuf, rules: Vec<WatchRule>) -> Self {
        Self { src, dist, rules }
    }

    pub(super) fn rules(&self) -> &[WatchRule] {
        &self.rules
    }

    /// Path relative to the source root, or `None` when it must be ignored.
    fn relative(&self, path: &Path) -> Option<String> {
        if path.starts_with(&self.dist) {
            return None;
        }
        rel_slash(path, &self.src).filter(|rel| !rel.is_empty())
    }

    /// Index of the rule handling `path`.
    pub(super) fn route(&self, path: &Path) -> Option<usize> {
        let rel = self.relative(path)?;
        self.rules.iter().position(|rule| rule.matches(&rel))
    }

    /// Group settled changes into one trigger per rule, in rule order.
    pub(super) fn group(&self, changes: FxHashMap<PathBuf, ChangeKind>) -> Vec<(usize, Trigger)> {
        let mut grouped: Vec<(usize, Trigger)> = Vec::new();
        for (path, kind) in changes {
            let Some(rel) = self.relative(&path) else {
                crate::debug!("watch"; "ignored {}: {}", kind.label(), path.display());
                continue;
            };
            let Some(index) = self.rules.iter().position(|rule| rule.matches(&rel)) else {
                crate::debug!("watch"; "no rule for {}", rel);
                continue;
            };
            crate::debug!("watch"; "{} {} -> {}", kind.label(), rel, self.rules[index].action);
            match grouped.iter_mut().find(|(i, _)| *i == index) {
                Some((_, trigger)) => trigger.paths.push(rel),
                None => grouped.push((index, Trigger { paths: vec![rel] })),
            }
        }

        grouped.sort_by_key(|(index, _)| *index);
        for (_, trigger) in &mut grouped {
            trigger.paths.sort();
        }
        grouped
    }
}
