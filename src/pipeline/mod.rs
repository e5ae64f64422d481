//! Asset pipelines.
//!
//! A [`Pipeline`] loads the files a [`FileMatcher`] selects and pushes them
//! through an ordered list of [`Stage`]s.
//!
//! # Execution Order
//!
//! ```text
//! files ──► stage 1 (all events) ──► flush ──► stage 2 (all events) ──► flush ──► ...
//! ```
//!
//! Every stage sees the whole batch before the next one starts, so a fatal
//! error in an early stage (a failed check, a syntax error) prevents every
//! later stage, including writes.

mod error;
pub mod stage;
mod task;

pub use error::{PipelineError, StageError};
pub use stage::Stage;
pub use task::{AssetClass, TaskName, TaskReport};

use std::fs;

use crate::asset::{FileEvent, FileMatcher};
use crate::{debug, log};

/// Ordered stages over the files one matcher selects.
pub struct Pipeline {
    task: TaskName,
    matcher: FileMatcher,
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(task: TaskName, matcher: FileMatcher) -> Self {
        Self {
            task,
            matcher,
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    pub fn pipe(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stage names in execution order.
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Load every matching file and apply the stages in order.
    pub fn run(mut self) -> Result<TaskReport, PipelineError> {
        let mut report = TaskReport::default();
        let mut events = self.load(&mut report)?;
        let task = self.task;
        debug!(
            task.as_str();
            "{} file(s) through {}",
            events.len(),
            self.stage_names().join(" -> ")
        );

        for stage in &mut self.stages {
            let mut next = Vec::with_capacity(events.len());
            for event in events {
                let path = event.path.clone();
                match stage.process(event) {
                    Ok(out) => next.extend(out),
                    Err(StageError::Recoverable(message)) => {
                        log!("warn"; "{}: {}: {}", task, path, message);
                        report.dropped += 1;
                    }
                    Err(StageError::Fatal(message)) => {
                        return Err(PipelineError::Stage {
                            task,
                            stage: stage.name(),
                            path: Some(path),
                            message,
                        });
                    }
                }
            }

            stage.flush().map_err(|e| PipelineError::Stage {
                task,
                stage: stage.name(),
                path: None,
                message: e.to_string(),
            })?;
            stage.tally(&mut report);

            debug!(task.as_str(); "{} -> {} file(s)", stage.name(), next.len());
            events = next;
        }

        Ok(report)
    }

    /// Read matched files. A file that cannot be read is dropped.
    fn load(&self, report: &mut TaskReport) -> Result<Vec<FileEvent>, PipelineError> {
        let root = self.matcher.root();
        if root.exists() {
            fs::read_dir(root).map_err(|source| PipelineError::SourceRoot {
                path: root.to_path_buf(),
                source,
            })?;
        }

        let mut events = Vec::new();
        for rel in self.matcher.files() {
            match fs::read(root.join(&rel)) {
                Ok(contents) => {
                    report.read += 1;
                    events.push(FileEvent::new(rel, contents));
                }
                Err(e) => {
                    log!("warn"; "{}: cannot read {}: {}", self.task, rel, e);
                    report.dropped += 1;
                }
            }
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::stage::Dest;
    use std::path::Path;
    use tempfile::TempDir;

    /// Uppercases text, drops `*.skip`, fails fatally on `*.boom`.
    struct Upper;

    impl Stage for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }

        fn process(&mut self, event: FileEvent) -> Result<Vec<FileEvent>, StageError> {
            if event.path.ends_with(".skip") {
                return Err(StageError::Recoverable("skipped".into()));
            }
            if event.path.ends_with(".boom") {
                return Err(StageError::Fatal("boom".into()));
            }
            let text = event.text().unwrap().to_uppercase();
            Ok(vec![event.with_contents(text)])
        }
    }

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_run_applies_stages_in_order() {
        let dir = TempDir::new().unwrap();
        let (src, dist) = (dir.path().join("src"), dir.path().join("dist"));
        write(&src, "a.txt", "hello");
        write(&src, "b.skip", "ignored");

        let matcher = FileMatcher::new(&src, "**/*", false).unwrap();
        let report = Pipeline::new(TaskName::Fonts, matcher)
            .pipe(Upper)
            .pipe(Dest::new(&dist))
            .run()
            .unwrap();

        assert_eq!(fs::read_to_string(dist.join("a.txt")).unwrap(), "HELLO");
        assert!(!dist.join("b.skip").exists());
        assert_eq!(report.read, 2);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.written, 1);
    }

    #[test]
    fn test_fatal_error_prevents_writes() {
        let dir = TempDir::new().unwrap();
        let (src, dist) = (dir.path().join("src"), dir.path().join("dist"));
        write(&src, "a.txt", "hello");
        write(&src, "z.boom", "bad");

        let matcher = FileMatcher::new(&src, "**/*", false).unwrap();
        let err = Pipeline::new(TaskName::Fonts, matcher)
            .pipe(Upper)
            .pipe(Dest::new(&dist))
            .run()
            .unwrap_err();

        match err {
            PipelineError::Stage { stage, path, .. } => {
                assert_eq!(stage, "upper");
                assert_eq!(path.as_deref(), Some("z.boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dist.join("a.txt").exists());
    }

    #[test]
    fn test_missing_root_is_empty_run() {
        let matcher = FileMatcher::new("/nonexistent/brook/src", "**/*", false).unwrap();
        let report = Pipeline::new(TaskName::Fonts, matcher).run().unwrap();
        assert_eq!(report, TaskReport::default());
    }
}
