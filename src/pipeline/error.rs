//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

use super::TaskName;

/// Outcome of a stage failing on one event or on flush.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageError {
    /// Reported, the event is dropped, the run continues.
    #[error("{0}")]
    Recoverable(String),

    /// Aborts the whole pipeline run.
    #[error("{0}")]
    Fatal(String),
}

/// Errors that end a task run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot read source root `{}`", path.display())]
    SourceRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{task}: {stage} failed{}: {message}", at_path(path))]
    Stage {
        task: TaskName,
        stage: &'static str,
        path: Option<String>,
        message: String,
    },

    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{task}: {message}")]
    Setup { task: TaskName, message: String },
}

fn at_path(path: &Option<String>) -> String {
    path.as_ref().map(|p| format!(" on {p}")).unwrap_or_default()
}

impl PipelineError {
    /// Path named by the error, for the reload overlay.
    pub fn path(&self) -> Option<String> {
        match self {
            Self::SourceRoot { path, .. } | Self::Io { path, .. } => {
                Some(path.display().to_string())
            }
            Self::Stage { path, .. } => path.clone(),
            Self::Setup { .. } => None,
        }
    }
}
