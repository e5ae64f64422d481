//! Style stages: SCSS compile, prefixing, declaration sorting, minification
//! and lint-and-fix.

pub mod lint;
mod report;
mod sass;

pub use lint::StyleLint;
pub use sass::SassCompile;

use lightningcss::properties::Property;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};

use super::Stage;
use crate::asset::FileEvent;
use crate::asset::minify::minify_css;
use crate::pipeline::StageError;

/// Resolve browserslist queries into lightningcss targets.
pub fn parse_browsers(queries: &[String]) -> Result<Targets, String> {
    let browsers = Browsers::from_browserslist(queries.iter().map(String::as_str))
        .map_err(|e| format!("invalid browserslist query: {e}"))?;
    Ok(browsers.map(Targets::from).unwrap_or_default())
}

fn css_text(event: &FileEvent) -> Result<&str, StageError> {
    event
        .text()
        .map_err(|e| StageError::Recoverable(format!("not valid UTF-8: {e}")))
}

/// Add vendor prefixes and lower syntax for the configured browsers.
pub struct Prefix {
    targets: Targets,
}

impl Prefix {
    pub fn new(browsers: &[String]) -> Result<Self, String> {
        Ok(Self {
            targets: parse_browsers(browsers)?,
        })
    }

    fn prefix(&self, css: &str) -> Result<String, String> {
        let mut sheet =
            StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
        sheet
            .minify(MinifyOptions {
                targets: self.targets,
                ..MinifyOptions::default()
            })
            .map_err(|e| e.to_string())?;
        let out = sheet
            .to_css(PrinterOptions {
                targets: self.targets,
                ..PrinterOptions::default()
            })
            .map_err(|e| e.to_string())?;
        Ok(out.code)
    }
}

impl Stage for Prefix {
    fn name(&self) -> &'static str {
        "prefix"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let css = self
            .prefix(css_text(&event)?)
            .map_err(StageError::Recoverable)?;
        Ok(vec![event.with_contents(css)])
    }
}

/// Order declarations alphabetically inside every style rule.
pub struct SortDeclarations;

impl SortDeclarations {
    fn sort(css: &str) -> Result<String, String> {
        let mut sheet =
            StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
        sort_rules(&mut sheet.rules);
        let out = sheet
            .to_css(PrinterOptions::default())
            .map_err(|e| e.to_string())?;
        Ok(out.code)
    }
}

fn sort_rules(rules: &mut CssRuleList<'_>) {
    for rule in &mut rules.0 {
        match rule {
            CssRule::Style(style) => {
                sort_properties(&mut style.declarations.declarations);
                sort_properties(&mut style.declarations.important_declarations);
                sort_rules(&mut style.rules);
            }
            CssRule::Media(media) => sort_rules(&mut media.rules),
            CssRule::Supports(supports) => sort_rules(&mut supports.rules),
            _ => {}
        }
    }
}

/// Stable: prefixed variants keep their place before the standard property.
fn sort_properties(properties: &mut [Property<'_>]) {
    properties.sort_by_cached_key(|p| p.property_id().name().to_string());
}

impl Stage for SortDeclarations {
    fn name(&self) -> &'static str {
        "sort"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let css = Self::sort(css_text(&event)?).map_err(StageError::Recoverable)?;
        Ok(vec![event.with_contents(css)])
    }
}

/// Minified printing.
pub struct MinifyCss;

impl Stage for MinifyCss {
    fn name(&self) -> &'static str {
        "minify-css"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let css = minify_css(css_text(&event)?).map_err(StageError::Recoverable)?;
        Ok(vec![event.with_contents(css)])
    }
}
