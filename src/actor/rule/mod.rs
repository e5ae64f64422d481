//! Rule Workers
//!
//! One worker per [`WatchRule`]. A worker runs its task on the blocking pool,
//! reports the outcome on the status line and tells the WsActor to reload or
//! to show the error overlay.
//!
//! The trigger channel holds a single slot: one run executes, at most one
//! more waits, and anything beyond that is coalesced into the waiting run.
//!
//! [`WatchRule`]: crate::actor::fs::WatchRule

mod state;

pub use state::WatchState;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::fs::RuleAction;
use super::messages::{Trigger, WsMsg};
use crate::config::ProjectConfig;
use crate::logger::{status_error, status_success};
use crate::pipeline::{AssetClass, PipelineError, TaskReport};

/// Runs the tasks of an asset class. Blocking.
pub trait TaskRunner: Send + Sync + 'static {
    fn run(&self, class: AssetClass) -> Result<TaskReport, PipelineError>;
}

impl TaskRunner for ProjectConfig {
    fn run(&self, class: AssetClass) -> Result<TaskReport, PipelineError> {
        class.run(self)
    }
}

/// FsActor's end of a worker.
pub struct RuleHandle {
    pub action: RuleAction,
    state: Arc<Mutex<WatchState>>,
    tx: mpsc::Sender<Trigger>,
}

impl RuleHandle {
    pub fn state(&self) -> WatchState {
        *self.state.lock()
    }

    /// A matching change entered the debounce window.
    pub fn mark_changed(&self) {
        self.state.lock().on_change();
    }

    /// Queue a run. Returns `false` once the worker is gone.
    pub fn dispatch(&self, trigger: Trigger) -> bool {
        match self.tx.try_send(trigger) {
            Ok(()) => true,
            Err(TrySendError::Full(trigger)) => {
                crate::debug!(
                    "watch";
                    "{} ({}): run already pending, merged {}",
                    self.action,
                    self.state().label(),
                    trigger.paths.join(", ")
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

/// Worker side: owns the trigger receiver.
pub struct RuleWorker {
    action: RuleAction,
    state: Arc<Mutex<WatchState>>,
    rx: mpsc::Receiver<Trigger>,
    runner: Arc<dyn TaskRunner>,
    ws_tx: mpsc::Sender<WsMsg>,
    reload_delay: Duration,
    /// Last run failed and its overlay is still showing.
    failed: bool,
}

impl RuleWorker {
    pub fn new(
        action: RuleAction,
        runner: Arc<dyn TaskRunner>,
        ws_tx: mpsc::Sender<WsMsg>,
        reload_delay: Duration,
    ) -> (Self, RuleHandle) {
        let (tx, rx) = mpsc::channel(1);
        let state = Arc::new(Mutex::new(WatchState::Idle));
        let worker = Self {
            action,
            state: Arc::clone(&state),
            rx,
            runner,
            ws_tx,
            reload_delay,
            failed: false,
        };
        (worker, RuleHandle { action, state, tx })
    }

    /// Run the worker loop until the FsActor drops its handle.
    pub async fn run(mut self) {
        while let Some(trigger) = self.rx.recv().await {
            self.state.lock().on_start();
            crate::debug!("watch"; "{}: running for {}", self.action, trigger.paths.join(", "));

            match self.execute(&trigger).await {
                Ok(summary) => {
                    self.state.lock().on_finish(true);
                    status_success(&summary);
                    if !self.succeeded(&trigger).await {
                        break;
                    }
                }
                Err((path, error)) => {
                    self.state.lock().on_finish(false);
                    status_error(&format!("{} failed", self.action), &error);
                    self.failed = true;
                    let path = path
                        .or_else(|| trigger.paths.first().cloned())
                        .unwrap_or_default();
                    let sent = self.ws_tx.send(WsMsg::Error { path, error }).await;
                    self.state.lock().on_reported();
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "{} worker stopped", self.action);
    }

    async fn execute(&self, trigger: &Trigger) -> Result<String, (Option<String>, String)> {
        match self.action {
            RuleAction::Reload => Ok(format!("changed: {}", trigger.paths.join(", "))),
            RuleAction::Task(class) => {
                let runner = Arc::clone(&self.runner);
                match tokio::task::spawn_blocking(move || runner.run(class)).await {
                    Ok(Ok(report)) => Ok(format!("{class}: {report}")),
                    Ok(Err(e)) => Err((e.path(), e.to_string())),
                    Err(e) => Err((None, format!("{class} task panicked: {e}"))),
                }
            }
        }
    }

    /// Clear a stale overlay, wait out the reload delay, then reload.
    /// Returns `false` once the WsActor is gone.
    async fn succeeded(&mut self, trigger: &Trigger) -> bool {
        if self.failed {
            self.failed = false;
            if self.ws_tx.send(WsMsg::ClearError).await.is_err() {
                return false;
            }
        }
        if !self.reload_delay.is_zero() {
            tokio::time::sleep(self.reload_delay).await;
        }
        let reason = match self.action {
            RuleAction::Task(class) => format!("{class} rebuilt"),
            RuleAction::Reload => format!("{} changed", trigger.paths.join(", ")),
        };
        self.ws_tx.send(WsMsg::Reload { reason }).await.is_ok()
    }
}
