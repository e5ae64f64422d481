//! Minification for JS and CSS.
//!
//! Uses oxc for JavaScript and lightningcss for CSS.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use oxc::syntax::es_target::ESTarget;
use oxc::transformer::EngineTargets;

/// Minify JavaScript source code without using syntax newer than `target`.
///
/// Returns the first parse error when `source` is not valid JavaScript.
pub fn minify_js(source: &str, target: ESTarget) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if let Some(err) = ret.errors.first() {
        return Err(err.to_string());
    }
    let mut program = ret.program;
    let engine_targets = EngineTargets::from_target(&target.to_string())?;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions {
            target: engine_targets,
            ..CompressOptions::smallest()
        }),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Ok(code)
}

/// Minify CSS source code.
pub fn minify_css(source: &str) -> Result<String, String> {
    let stylesheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..PrinterOptions::default()
        })
        .map_err(|e| e.to_string())?;
    Ok(result.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js() {
        let source = "var greeting = 'hello';\nconsole.log( greeting );\n";
        let out = minify_js(source, ESTarget::ESNext).unwrap();
        assert!(out.contains("console.log"));
        assert!(out.len() < source.len());
    }

    #[test]
    fn test_minify_js_invalid() {
        assert!(minify_js("function (", ESTarget::ESNext).is_err());
    }

    #[test]
    fn test_minify_js_keeps_lowered_syntax() {
        let lowered = "const f = function(a) {\n\
                       \treturn a === null || a === void 0 ? void 0 : a.b;\n\
                       };\nwindow.f = f;\n";
        let out = minify_js(lowered, ESTarget::ES2015).unwrap();
        assert!(!out.contains("?."), "{out}");
    }

    #[test]
    fn test_minify_css() {
        let out = minify_css("a {\n  color: #ff0000;\n  margin: 0px;\n}\n").unwrap();
        assert_eq!(out, "a{color:red;margin:0}");
    }
}
