//! Stages: one transformation over a batch of [`FileEvent`]s.
//!
//! Each stage wraps exactly one external capability:
//!
//! | Stage            | Capability                         |
//! |------------------|------------------------------------|
//! | `check`          | oxc semantic rule walk             |
//! | `transpile`      | oxc transformer                    |
//! | `minify-js`      | oxc minifier                       |
//! | `sass`           | grass                              |
//! | `prefix`         | lightningcss + browserslist        |
//! | `sort`           | lightningcss declaration order     |
//! | `minify-css`     | lightningcss minified printer      |
//! | `stylelint`      | built-in style rules               |
//! | `compress`       | image / usvg                       |
//! | `rename`, `dest` | paths and the filesystem           |

mod dest;
pub mod image;
pub mod script;
pub mod style;

pub use dest::{Dest, Rename};

use super::{StageError, TaskReport};
use crate::asset::FileEvent;

/// One step of a pipeline.
///
/// `process` maps one event to zero, one or many events. `flush` runs once
/// after the whole batch went through `process`.
pub trait Stage: Send {
    fn name(&self) -> &'static str;

    fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError>;

    fn flush(&mut self) -> Result<(), StageError> {
        Ok(())
    }

    /// Add this stage's counters to the run report.
    fn tally(&self, _report: &mut TaskReport) {}
}

/// 1-based line and column of a byte offset.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}
