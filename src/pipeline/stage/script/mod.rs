//! Script stages: static analysis, transpiling and minification.

mod check;

pub use check::{Check, RULE_NAMES};

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::syntax::es_target::ESTarget;
use oxc::transformer::{TransformOptions, Transformer};

use super::Stage;
use crate::asset::FileEvent;
use crate::asset::minify::minify_js;
use crate::pipeline::StageError;

/// Scripts are parsed as ES modules.
fn source_type() -> SourceType {
    SourceType::mjs()
}

/// Transform options for a lowering target such as `es2015` or `esnext`.
pub fn parse_target(target: &str) -> Result<TransformOptions, String> {
    TransformOptions::from_target(target)
}

fn utf8(event: &FileEvent) -> Result<&str, StageError> {
    event
        .text()
        .map_err(|e| StageError::Fatal(format!("not valid UTF-8: {e}")))
}

/// Lower scripts to the configured target.
pub struct Transpile {
    target: String,
}

impl Transpile {
    pub fn new(target: &str) -> Result<Self, String> {
        parse_target(target)?;
        Ok(Self {
            target: target.to_string(),
        })
    }

    fn transpile(&self, source: &str, path: &str) -> Result<String, String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, source_type()).parse();
        if let Some(err) = ret.errors.first() {
            return Err(err.to_string());
        }

        let mut program = ret.program;
        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();

        let options = parse_target(&self.target)?;
        let ret = Transformer::new(&allocator, Path::new(path), &options)
            .build_with_scoping(scoping, &mut program);
        if let Some(err) = ret.errors.first() {
            return Err(err.to_string());
        }

        Ok(Codegen::new().build(&program).code)
    }
}

impl Stage for Transpile {
    fn name(&self) -> &'static str {
        "transpile"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let code = self
            .transpile(utf8(&event)?, &event.path)
            .map_err(StageError::Fatal)?;
        Ok(vec![event.with_contents(code)])
    }
}

/// Minify transpiled scripts. Input that does not parse is dropped.
///
/// Compression stays within `target` so lowered syntax is not restored.
pub struct MinifyJs {
    target: ESTarget,
}

impl MinifyJs {
    pub fn new(target: &str) -> Result<Self, String> {
        let target = target
            .parse::<ESTarget>()
            .map_err(|e| format!("invalid target `{target}`: {e}"))?;
        Ok(Self { target })
    }
}

impl Stage for MinifyJs {
    fn name(&self) -> &'static str {
        "minify-js"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let source = event
            .text()
            .map_err(|e| StageError::Recoverable(format!("not valid UTF-8: {e}")))?;
        let code = minify_js(source, self.target).map_err(StageError::Recoverable)?;
        Ok(vec![event.with_contents(code)])
    }
}
