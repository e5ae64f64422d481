//! One-shot build passes.
//!
//! `build_all` runs every enabled asset class concurrently on the rayon pool
//! and waits for all of them. `run_tasks` runs named tasks in series.

use rayon::prelude::*;

use crate::config::ProjectConfig;
use crate::logger::ProgressLine;
use crate::pipeline::{AssetClass, PipelineError, TaskName, TaskReport};
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// Run every enabled asset class once. Returns `true` when none failed.
///
/// A failing class never stops the others; every failure is reported.
pub fn build_all(config: &ProjectConfig) -> bool {
    let classes: Vec<AssetClass> = AssetClass::ALL
        .into_iter()
        .filter(|class| class.enabled(config))
        .collect();
    if classes.is_empty() {
        log!("build"; "every asset class is disabled, nothing to do");
        return true;
    }

    let progress = ProgressLine::new(&[("tasks", classes.len())]);
    let results: Vec<(AssetClass, Result<TaskReport, PipelineError>)> = classes
        .par_iter()
        .map(|&class| {
            let result = class.run(config);
            progress.inc("tasks");
            (class, result)
        })
        .collect();
    progress.finish();

    summarize(results)
}

/// Run the named tasks once, in order. Stops at the first fatal error.
pub fn run_tasks(config: &ProjectConfig, tasks: &[TaskName]) -> bool {
    for &task in tasks {
        match task.run(config) {
            Ok(report) => log!(task.as_str(); "{}", report),
            Err(e) => {
                log!("error"; "{}", e);
                return false;
            }
        }
    }
    true
}

/// Log per-class outcomes and the overall result.
fn summarize<N: std::fmt::Display>(results: Vec<(N, Result<TaskReport, PipelineError>)>) -> bool {
    let mut total = TaskReport::default();
    let mut failures = 0;
    for (name, result) in results {
        match result {
            Ok(report) => {
                debug!("build"; "{}: {}", name, report);
                total += report;
            }
            Err(e) => {
                log!("error"; "{}: {}", name, e);
                failures += 1;
            }
        }
    }

    if failures == 0 {
        log!("build"; "{}", total);
    } else {
        log!("build"; "{}, {}", total, plural_count(failures, "failed task"));
    }
    failures == 0
}
