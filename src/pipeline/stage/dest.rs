//! Path rewriting and writing to disk.

use std::fs;
use std::path::PathBuf;

use super::Stage;
use crate::asset::FileEvent;
use crate::pipeline::{StageError, TaskReport};

/// Change a file's extension or add a suffix before it.
///
/// - `Rename::extension("min.js")`: `js/main.es6` → `js/main.min.js`
/// - `Rename::suffix(".min")`: `a.css` → `a.min.css`
#[derive(Debug, Clone)]
pub enum Rename {
    Extension(&'static str),
    Suffix(&'static str),
}

impl Rename {
    pub const fn extension(ext: &'static str) -> Self {
        Self::Extension(ext)
    }

    pub const fn suffix(suffix: &'static str) -> Self {
        Self::Suffix(suffix)
    }

    fn apply(&self, path: &str) -> String {
        let name_start = path.rfind('/').map_or(0, |i| i + 1);
        let (stem, ext) = match path[name_start..].rfind('.') {
            Some(dot) if dot > 0 => path.split_at(name_start + dot),
            _ => (path, ""),
        };
        match self {
            Self::Extension(new_ext) => format!("{stem}.{new_ext}"),
            Self::Suffix(suffix) => format!("{stem}{suffix}{ext}"),
        }
    }
}

impl Stage for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn process(&mut self, mut event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        event.path = self.apply(&event.path);
        Ok(vec![event])
    }
}

/// Write each event under `root` and pass it on unchanged.
///
/// A file whose blake3 digest already matches is left untouched, so
/// unchanged outputs keep their mtime and do not wake file watchers.
#[derive(Debug)]
pub struct Dest {
    root: PathBuf,
    written: usize,
    unchanged: usize,
}

impl Dest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: 0,
            unchanged: 0,
        }
    }

    fn is_unchanged(path: &std::path::Path, contents: &[u8]) -> bool {
        fs::read(path).is_ok_and(|existing| blake3::hash(&existing) == blake3::hash(contents))
    }
}

impl Stage for Dest {
    fn name(&self) -> &'static str {
        "dest"
    }

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
        let target = self.root.join(&event.path);

        if Self::is_unchanged(&target, &event.contents) {
            self.unchanged += 1;
            return Ok(vec![event]);
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                StageError::Fatal(format!("cannot create `{}`: {e}", parent.display()))
            })?;
        }
        // recorded first: the watcher may see the write before it returns
        crate::core::record_write(&target, &event.contents);
        fs::write(&target, &event.contents)
            .map_err(|e| StageError::Fatal(format!("cannot write `{}`: {e}", target.display())))?;
        self.written += 1;
        Ok(vec![event])
    }

    fn tally(&self, report: &mut TaskReport) {
        report.written += self.written;
        report.unchanged += self.unchanged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rename_extension() {
        let rename = Rename::extension("min.js");
        assert_eq!(rename.apply("main.es6"), "main.min.js");
        assert_eq!(rename.apply("js/v1.2/app.es6"), "js/v1.2/app.min.js");
        assert_eq!(Rename::extension("css").apply("scss/a.scss"), "scss/a.css");
    }

    #[test]
    fn test_rename_suffix() {
        let rename = Rename::suffix(".min");
        assert_eq!(rename.apply("a.css"), "a.min.css");
        assert_eq!(rename.apply("css/theme.dark.css"), "css/theme.dark.min.css");
        assert_eq!(rename.apply("LICENSE"), "LICENSE.min");
    }

    #[test]
    fn test_dest_writes_then_skips_identical() {
        let dir = TempDir::new().unwrap();
        let mut dest = Dest::new(dir.path());

        let event = FileEvent::new("css/a.css", "a{}");
        let out = dest.process(event.clone()).unwrap();
        assert_eq!(out, vec![event.clone()]);
        assert_eq!(fs::read_to_string(dir.path().join("css/a.css")).unwrap(), "a{}");

        dest.process(event).unwrap();
        dest.process(FileEvent::new("css/a.css", "b{}")).unwrap();

        let mut report = TaskReport::default();
        dest.tally(&mut report);
        assert_eq!((report.written, report.unchanged), (2, 1));
    }

    #[test]
    fn test_dest_records_own_writes() {
        let dir = TempDir::new().unwrap();
        let mut dest = Dest::new(dir.path());
        dest.process(FileEvent::new("scss/a.scss", "a{}")).unwrap();
        assert!(crate::core::is_own_write(&dir.path().join("scss/a.scss")));
    }
}
