//! FileSystem Actor
//!
//! Watches the source root and routes debounced changes to rule workers.
//! The watcher starts before the initial build so no change is lost while
//! it runs.
//!
//! Architecture:
//! ```text
//! Watcher → Debouncer (pure timing) → Router (rule lookup) → Trigger
//! ```

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::rule::RuleHandle;
use crate::config::ProjectConfig;

// Pure timing and deduplication.
mod debouncer;
// Watch rules and path → rule routing.
mod router;
// Shared fs event types.
mod types;

#[cfg(test)]
mod tests;

use debouncer::Debouncer;
use router::Router;

pub use router::{RuleAction, WatchRule, build_rules};

/// Debouncer, router and worker handles: everything but the OS watcher.
pub(super) struct Dispatcher {
    debouncer: Debouncer,
    router: Router,
    handles: Vec<RuleHandle>,
}

impl Dispatcher {
    /// `handles[i]` must belong to `rules[i]`.
    pub(super) fn new(
        config: &ProjectConfig,
        rules: Vec<WatchRule>,
        handles: Vec<RuleHandle>,
    ) -> Self {
        debug_assert_eq!(rules.len(), handles.len());
        Self {
            debouncer: Debouncer::new(config.watch.debounce()),
            router: Router::new(config.src().to_path_buf(), config.dist().to_path_buf(), rules),
            handles,
        }
    }

    /// Feed one notify event; matching rules enter `Debouncing`.
    ///
    /// Paths the pipeline wrote are left for `flush` to settle.
    pub(super) fn on_event(&mut self, event: &notify::Event) {
        for path in self.debouncer.add_event(event) {
            if crate::core::is_recorded(&path) {
                continue;
            }
            if let Some(index) = self.router.route(&path) {
                self.handles[index].mark_changed();
            }
        }
    }

    /// Dispatch settled changes. Returns `Err(())` once a worker is gone.
    ///
    /// Files that still hold what the pipeline wrote are dropped.
    pub(super) fn flush(&mut self) -> Result<(), ()> {
        let Some(mut changes) = self.debouncer.take_if_ready() else {
            return Ok(());
        };
        changes.retain(|path, _| {
            let own = crate::core::is_own_write(path);
            if own {
                crate::debug!("watch"; "skip own write {}", path.display());
            }
            !own
        });

        for (index, trigger) in self.router.group(changes) {
            let handle = &self.handles[index];
            crate::debug!(
                "watch";
                "{} <- {} ({})",
                handle.action,
                trigger.paths.join(", "),
                self.router.rules()[index].pattern
            );
            if !handle.dispatch(trigger) {
                return Err(());
            }
        }
        Ok(())
    }

    pub(super) fn sleep_duration(&self) -> std::time::Duration {
        self.debouncer.sleep_duration()
    }
}

/// FileSystem Actor - watches for file changes
pub struct FsActor {
    /// Channel to receive notify events (sync -> async bridge)
    notify_rx: std::sync::mpsc::Receiver<notify::Result<notify::Event>>,
    /// Watcher handle (must be kept alive)
    watcher: RecommendedWatcher,
    dispatcher: Dispatcher,
}

impl FsActor {
    /// Start watching `config.src()` immediately.
    ///
    /// Events buffer in the channel while the caller runs the initial build.
    pub fn new(
        config: &ProjectConfig,
        rules: Vec<WatchRule>,
        handles: Vec<RuleHandle>,
    ) -> notify::Result<Self> {
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;
        watcher.watch(config.src(), RecursiveMode::Recursive)?;
        crate::debug!("watch"; "watching {}", config.src().display());

        Ok(Self {
            notify_rx,
            watcher,
            dispatcher: Dispatcher::new(config, rules, handles),
        })
    }

    /// Run the actor event loop
    pub async fn run(self) {
        let notify_rx = self.notify_rx;
        let _watcher = self.watcher;
        let mut dispatcher = self.dispatcher;

        let (async_tx, mut async_rx) = mpsc::channel::<notify::Event>(64);

        // Poll notify events on a plain thread and forward them to the async side.
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => {
                        if async_tx.blocking_send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        loop {
            tokio::select! {
                biased;
                event = async_rx.recv() => match event {
                    Some(event) => dispatcher.on_event(&event),
                    None => break,
                },
                _ = tokio::time::sleep(dispatcher.sleep_duration()) => {
                    if crate::core::is_shutdown() || dispatcher.flush().is_err() {
                        break;
                    }
                }
            }
        }
        crate::debug!("watch"; "watcher stopped");
    }
}
