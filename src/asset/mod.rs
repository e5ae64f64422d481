//! Source files flowing through the pipelines.
//!
//! - [`FileMatcher`]: glob selection of files under a source root
//! - [`FileEvent`]: one file in flight between stages
//! - [`minify`]: JS and CSS minification shared by stages and the build script

mod matcher;
pub mod minify;

pub use matcher::FileMatcher;

use std::fmt;
use std::path::Path;

/// One file in flight through a pipeline.
///
/// `path` is relative to the pipeline's source root and always uses
/// forward slashes.
#[derive(Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: String,
    pub contents: Vec<u8>,
}

impl FileEvent {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// Contents as UTF-8 text.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.contents)
    }

    /// Lowercased extension of `path`, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
    }

    /// Same path, new contents.
    pub fn with_contents(self, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: self.path,
            contents: contents.into(),
        }
    }
}

impl fmt::Debug for FileEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEvent")
            .field("path", &self.path)
            .field("len", &self.contents.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_event_extension() {
        assert_eq!(
            FileEvent::new("img/Logo.PNG", vec![]).extension().as_deref(),
            Some("png")
        );
        assert_eq!(FileEvent::new("Makefile", vec![]).extension(), None);
    }

    #[test]
    fn test_file_event_text() {
        let event = FileEvent::new("a.scss", "a { color: red; }");
        assert_eq!(event.text().unwrap(), "a { color: red; }");
        assert!(FileEvent::new("a.bin", vec![0xff, 0xfe]).text().is_err());
    }
}
