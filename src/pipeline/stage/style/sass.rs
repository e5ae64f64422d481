//! SCSS compilation with glob imports.
//!
//! `@import "components/**/*";` expands to one `@import` per matching style
//! file, in sorted order. Each expanded import is named the way the compiler
//! resolves it: no partial `_` prefix, no extension. Expansion applies to
//! the entry file and, through [`GlobImportFs`], to every file the compiler
//! loads.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use globset::GlobBuilder;
use jwalk::WalkDir;
use regex::{Captures, Regex};

use crate::asset::FileEvent;
use crate::pipeline::StageError;
use crate::pipeline::stage::Stage;
use crate::utils::path::rel_slash;

static GLOB_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+["']([^"']*[*?{][^"']*)["']\s*;?"#).unwrap()
});

const STYLE_EXTENSIONS: &[&str] = &[".scss", ".sass", ".css"];

fn is_style(path: &str) -> bool {
    STYLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Replace glob imports in `source`, resolved relative to `file`'s directory.
pub fn expand_glob_imports(source: &str, file: &Path) -> String {
    if !source.contains("@import") {
        return source.to_string();
    }
    let dir = file.parent().unwrap_or(Path::new(""));
    GLOB_IMPORT
        .replace_all(source, |caps: &Captures<'_>| {
            let mut seen = HashSet::new();
            glob_files(dir, &caps[1], file)
                .iter()
                .map(|path| import_name(path))
                .filter(|name| seen.insert(name.clone()))
                .map(|name| format!("@import \"{name}\";"))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .into_owned()
}

/// `blocks/_card.scss` imports as `blocks/card`.
fn import_name(path: &str) -> String {
    let (dir, file) = match path.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, path),
    };
    let file = file.strip_prefix('_').unwrap_or(file);
    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    match dir {
        Some(dir) => format!("{dir}/{stem}"),
        None => stem.to_string(),
    }
}

/// Style files matching `pattern` under `dir`, sorted, excluding `current`.
fn glob_files(dir: &Path, pattern: &str, current: &Path) -> Vec<String> {
    // Split `../shared/**/*.scss` into a literal base and the glob part.
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal = segments
        .iter()
        .take_while(|s| !s.contains(['*', '?', '[', '{']))
        .count();
    let base = segments[..literal].join("/");
    let rest = segments[literal..].join("/");

    let Ok(glob) = GlobBuilder::new(&rest).literal_separator(true).build() else {
        return Vec::new();
    };
    let matcher = glob.compile_matcher();
    let base_dir = dir.join(&base);

    let mut files: Vec<String> = WalkDir::new(&base_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && e.path() != current)
        .filter_map(|e| rel_slash(&e.path(), &base_dir))
        .filter(|rel| is_style(rel) && matcher.is_match(rel))
        .collect();
    files.sort();

    if base.is_empty() {
        files
    } else {
        files.into_iter().map(|rel| format!("{base}/{rel}")).collect()
    }
}

/// Filesystem seen by the compiler: disk reads with glob imports expanded.
#[derive(Debug)]
struct GlobImportFs;

impl grass::Fs for GlobImportFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = fs::read(path)?;
        if !is_style(&path.to_string_lossy()) {
            return Ok(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Ok(expand_glob_imports(&text, path).into_bytes()),
            Err(e) => Ok(e.into_bytes()),
        }
    }
}

/// Compile SCSS to expanded CSS. Compile errors drop the file.
pub struct SassCompile {
    src_root: PathBuf,
}

impl SassCompile {
    pub fn new(src_root: impl Into<PathBuf>) -> Self {
        Self {
            src_root: src_root.into(),
        }
    }

    fn compile(&self, source: &str, rel: &str) -> Result<String, String> {
        let file = self.src_root.join(rel);
        let dir = file.parent().unwrap_or(&self.src_root);
        let input = expand_glob_imports(source, &file);

        let options = grass::Options::default()
            .style(grass::OutputStyle::Expanded)
            .load_path(dir)
            .load_path(&self.src_root)
            .fs(&GlobImportFs);

        grass::from_string(input, &options).map_err(|e| e.to_string())
    }
}

impl Stage for SassCompile {
    fn name(&self) -> &'static str {
        "sass"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let source = event
            .text()
            .map_err(|e| StageError::Recoverable(format!("not valid UTF-8: {e}")))?;
        let css = self
            .compile(source, &event.path)
            .map_err(StageError::Recoverable)?;
        Ok(vec![event.with_contents(css)])
    }
}
