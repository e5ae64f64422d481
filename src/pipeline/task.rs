//! Task catalogue: which stages run for which files.
//!
//! | Task        | Partials | Stages                                                   |
//! |-------------|----------|----------------------------------------------------------|
//! | `scripts`   | skipped  | check → transpile → minify → rename(min.js) → dest(dist) |
//! | `stylelint` | kept     | stylelint → dest(src)                                    |
//! | `styles`    | skipped  | sass → prefix → sort → rename(css) → dest                |
//! |             |          | → minify → rename(.min) → dest                           |
//! | `images`    | kept     | compress → dest(dist)                                    |
//! | `fonts`     | kept     | dest(dist)                                               |

use std::fmt;
use std::fs;
use std::ops::AddAssign;

use crate::asset::FileMatcher;
use crate::config::ProjectConfig;

use super::stage::image::Compress;
use super::stage::script::{Check, MinifyJs, Transpile};
use super::stage::style::{MinifyCss, Prefix, SassCompile, SortDeclarations, StyleLint};
use super::stage::{Dest, Rename};
use super::{Pipeline, PipelineError};

/// Per-run counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Files loaded from the source root.
    pub read: usize,
    /// Files written by `dest` stages.
    pub written: usize,
    /// Files `dest` stages left alone because the digest matched.
    pub unchanged: usize,
    /// Events dropped on recoverable errors.
    pub dropped: usize,
}

impl AddAssign for TaskReport {
    fn add_assign(&mut self, rhs: Self) {
        self.read += rhs.read;
        self.written += rhs.written;
        self.unchanged += rhs.unchanged;
        self.dropped += rhs.dropped;
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} read, {} written, {} unchanged",
            self.read, self.written, self.unchanged
        )?;
        if self.dropped > 0 {
            write!(f, ", {} dropped", self.dropped)?;
        }
        Ok(())
    }
}

/// A named pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum TaskName {
    Scripts,
    Stylelint,
    Styles,
    Images,
    Fonts,
}

impl TaskName {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Stylelint => "stylelint",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Fonts => "fonts",
        }
    }

    /// Build this task's pipeline. Stages are fresh for every call.
    pub fn pipeline(self, config: &ProjectConfig) -> Result<Pipeline, PipelineError> {
        let setup = move |message: String| PipelineError::Setup {
            task: self,
            message,
        };
        let matcher = |pattern: &str, skip_partials: bool| {
            FileMatcher::new(config.src(), pattern, skip_partials)
                .map_err(|e| setup(format!("invalid pattern `{pattern}`: {}", e.kind())))
        };
        let (src, dist) = (config.src(), config.dist());

        let pipeline = match self {
            Self::Scripts => {
                let scripts = &config.scripts;
                let mut pipeline = Pipeline::new(self, matcher(&scripts.pattern, true)?)
                    .pipe(Check::new(&scripts.lint))
                    .pipe(Transpile::new(&scripts.target).map_err(setup)?);
                if scripts.minify {
                    pipeline = pipeline.pipe(MinifyJs::new(&scripts.target).map_err(setup)?);
                }
                pipeline
                    .pipe(Rename::extension("min.js"))
                    .pipe(Dest::new(dist))
            }
            Self::Stylelint => Pipeline::new(self, matcher(&config.styles.pattern, false)?)
                .pipe(StyleLint::new(src, &config.styles.lint))
                .pipe(Dest::new(src)),
            Self::Styles => {
                let styles = &config.styles;
                let mut pipeline = Pipeline::new(self, matcher(&styles.pattern, true)?)
                    .pipe(SassCompile::new(src))
                    .pipe(Prefix::new(&styles.browsers).map_err(setup)?);
                if styles.sort {
                    pipeline = pipeline.pipe(SortDeclarations);
                }
                pipeline
                    .pipe(Rename::extension("css"))
                    .pipe(Dest::new(dist))
                    .pipe(MinifyCss)
                    .pipe(Rename::suffix(".min"))
                    .pipe(Dest::new(dist))
            }
            Self::Images => Pipeline::new(self, matcher(&config.images.pattern, false)?)
                .pipe(Compress::new(config.images.jpeg_quality))
                .pipe(Dest::new(dist)),
            Self::Fonts => Pipeline::new(self, matcher(&config.fonts.pattern, false)?)
                .pipe(Dest::new(dist)),
        };
        Ok(pipeline)
    }

    /// Run this task once.
    pub fn run(self, config: &ProjectConfig) -> Result<TaskReport, PipelineError> {
        let dist = config.dist();
        fs::create_dir_all(dist).map_err(|source| PipelineError::Io {
            path: dist.to_path_buf(),
            source,
        })?;
        self.pipeline(config)?.run()
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A group of tasks rebuilt together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetClass {
    Scripts,
    Styles,
    Images,
    Fonts,
}

impl AssetClass {
    pub const ALL: [Self; 4] = [Self::Scripts, Self::Styles, Self::Images, Self::Fonts];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scripts => "scripts",
            Self::Styles => "styles",
            Self::Images => "images",
            Self::Fonts => "fonts",
        }
    }

    pub fn enabled(self, config: &ProjectConfig) -> bool {
        match self {
            Self::Scripts => config.scripts.enable,
            Self::Styles => config.styles.enable,
            Self::Images => config.images.enable,
            Self::Fonts => config.fonts.enable,
        }
    }

    /// Source glob that triggers this class in watch mode.
    pub fn pattern(self, config: &ProjectConfig) -> &str {
        match self {
            Self::Scripts => &config.scripts.pattern,
            Self::Styles => &config.styles.pattern,
            Self::Images => &config.images.pattern,
            Self::Fonts => &config.fonts.pattern,
        }
    }

    /// Tasks run in series for this class. Lint must pass before compiling.
    pub fn tasks(self, config: &ProjectConfig) -> Vec<TaskName> {
        match self {
            Self::Scripts => vec![TaskName::Scripts],
            Self::Styles if config.styles.lint.enable => {
                vec![TaskName::Stylelint, TaskName::Styles]
            }
            Self::Styles => vec![TaskName::Styles],
            Self::Images => vec![TaskName::Images],
            Self::Fonts => vec![TaskName::Fonts],
        }
    }

    /// Run every task of this class in series, stopping at the first failure.
    pub fn run(self, config: &ProjectConfig) -> Result<TaskReport, PipelineError> {
        let mut report = TaskReport::default();
        for task in self.tasks(config) {
            report += task.run(config)?;
        }
        Ok(report)
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
