use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::debouncer::Debouncer;
use super::router::Router;
use super::types::ChangeKind;
use super::{Dispatcher, RuleAction, build_rules};
use crate::actor::messages::WsMsg;
use crate::asset::FileEvent;
use crate::actor::rule::{RuleHandle, RuleWorker, TaskRunner, WatchState};
use crate::config::{ProjectConfig, test_project_config};
use crate::pipeline::stage::Dest;
use crate::pipeline::{AssetClass, PipelineError, Stage, TaskName, TaskReport};

const WINDOW: Duration = Duration::from_millis(300);

fn make_config(extra: &str) -> (TempDir, ProjectConfig) {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("src/scss")).unwrap();
    std::fs::create_dir_all(temp.path().join("dist")).unwrap();
    let config = test_project_config(temp.path(), extra);
    (temp, config)
}

fn touch(config: &ProjectConfig, rel: &str) -> PathBuf {
    let path = config.src().join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "").unwrap();
    path
}

fn make_event(paths: Vec<&Path>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(Path::to_path_buf).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn metadata_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn router(config: &ProjectConfig) -> Router {
    Router::new(
        config.src().to_path_buf(),
        config.dist().to_path_buf(),
        build_rules(config).unwrap(),
    )
}

#[derive(Default)]
struct CountingRunner {
    runs: AtomicUsize,
    fail: AtomicBool,
}

impl TaskRunner for CountingRunner {
    fn run(&self, class: AssetClass) -> Result<TaskReport, PipelineError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(PipelineError::Stage {
                task: TaskName::Styles,
                stage: "sass",
                path: Some("style.scss".into()),
                message: format!("{class}: expected \";\""),
            });
        }
        Ok(TaskReport::default())
    }
}

struct Harness {
    dispatcher: Dispatcher,
    workers: Vec<JoinHandle<()>>,
    ws_rx: mpsc::Receiver<WsMsg>,
    runner: Arc<CountingRunner>,
}

impl Harness {
    fn new(config: &ProjectConfig) -> Self {
        let runner = Arc::new(CountingRunner::default());
        let (ws_tx, ws_rx) = mpsc::channel(32);
        let rules = build_rules(config).unwrap();
        let mut handles: Vec<RuleHandle> = Vec::new();
        let mut workers = Vec::new();
        for rule in &rules {
            let (worker, handle) = RuleWorker::new(
                rule.action,
                Arc::clone(&runner) as Arc<dyn TaskRunner>,
                ws_tx.clone(),
                Duration::ZERO,
            );
            workers.push(tokio::spawn(worker.run()));
            handles.push(handle);
        }
        Self {
            dispatcher: Dispatcher::new(config, rules, handles),
            workers,
            ws_rx,
            runner,
        }
    }

    fn state_of(&self, action: RuleAction) -> WatchState {
        self.dispatcher
            .handles
            .iter()
            .find(|h| h.action == action)
            .unwrap()
            .state()
    }

    /// Drop the handles, wait for every worker, collect what reached the WsActor.
    async fn finish(self) -> (usize, Vec<WsMsg>) {
        let Self {
            dispatcher,
            workers,
            mut ws_rx,
            runner,
        } = self;
        drop(dispatcher);
        for worker in workers {
            worker.await.unwrap();
        }
        let mut messages = Vec::new();
        while let Ok(msg) = ws_rx.try_recv() {
            messages.push(msg);
        }
        (runner.runs.load(Ordering::SeqCst), messages)
    }
}

fn reloads(messages: &[WsMsg]) -> usize {
    messages
        .iter()
        .filter(|m| matches!(m, WsMsg::Reload { .. }))
        .count()
}

// =============================================================================
// Debouncer
// =============================================================================

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new(WINDOW);
    assert!(!debouncer.is_ready());
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec![Path::new("/tmp/a.scss")], create_kind()));
    debouncer.add_event(&make_event(vec![Path::new("/tmp/b.scss")], modify_kind()));
    debouncer.add_event(&make_event(vec![Path::new("/tmp/c.scss")], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/a.scss")],
        ChangeKind::Created
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/b.scss")],
        ChangeKind::Modified
    );
    assert_eq!(
        debouncer.changes[&PathBuf::from("/tmp/c.scss")],
        ChangeKind::Removed
    );
}

#[test]
fn test_temp_and_metadata_ignored() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add_event(&make_event(vec![Path::new("/tmp/real.scss")], modify_kind()));
    let first_time = debouncer.last_event.unwrap();

    std::thread::sleep(Duration::from_millis(5));

    assert!(
        debouncer
            .add_event(&make_event(vec![Path::new("/tmp/.style.scss.swp")], modify_kind()))
            .is_empty()
    );
    assert!(
        debouncer
            .add_event(&make_event(vec![Path::new("/tmp/style.scss~")], modify_kind()))
            .is_empty()
    );
    assert!(
        debouncer
            .add_event(&make_event(vec![Path::new("/tmp/other.scss")], metadata_kind()))
            .is_empty()
    );
    assert_eq!(debouncer.last_event.unwrap(), first_time);
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_repeated_writes_coalesce() {
    let mut debouncer = Debouncer::new(WINDOW);
    let path = Path::new("/tmp/style.scss");

    assert_eq!(debouncer.add_event(&make_event(vec![path], modify_kind())).len(), 1);
    assert!(debouncer.add_event(&make_event(vec![path], modify_kind())).is_empty());
    assert!(debouncer.add_event(&make_event(vec![path, path], modify_kind())).is_empty());
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = Debouncer::new(Duration::ZERO);
    let path = Path::new("/tmp/a.scss");

    debouncer.add_event(&make_event(vec![path], create_kind()));
    debouncer.add_event(&make_event(vec![path], remove_kind()));
    assert!(debouncer.changes.is_empty());

    // The window closes with nothing to release, and the timer resets.
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_modify_then_remove_upgrades() {
    let mut debouncer = Debouncer::new(WINDOW);
    let path = Path::new("/tmp/a.scss");

    debouncer.add_event(&make_event(vec![path], modify_kind()));
    debouncer.add_event(&make_event(vec![path], remove_kind()));
    assert_eq!(debouncer.changes[&PathBuf::from(path)], ChangeKind::Removed);
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = Debouncer::new(WINDOW);
    let path = Path::new("/tmp/a.scss");

    debouncer.add_event(&make_event(vec![path], remove_kind()));
    debouncer.add_event(&make_event(vec![path], create_kind()));
    assert_eq!(debouncer.changes[&PathBuf::from(path)], ChangeKind::Created);
}

#[test]
fn test_sleep_duration() {
    let mut debouncer = Debouncer::new(WINDOW);
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));

    debouncer.last_event = Some(std::time::Instant::now());
    let dur = debouncer.sleep_duration();
    assert!(dur <= WINDOW);
    assert!(dur >= WINDOW - Duration::from_millis(50));
}

#[test]
fn test_take_waits_for_window() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add_event(&make_event(vec![Path::new("/tmp/a.scss")], modify_kind()));
    assert!(debouncer.take_if_ready().is_none());
    assert_eq!(debouncer.changes.len(), 1);
}

// =============================================================================
// Router
// =============================================================================

#[test]
fn test_route_to_exactly_one_rule() {
    let (_tmp, config) = make_config("");
    let router = router(&config);
    let action = |rel: &str| {
        router
            .route(&config.src().join(rel))
            .map(|i| router.rules()[i].action)
    };

    assert_eq!(action("scss/style.scss"), Some(RuleAction::Task(AssetClass::Styles)));
    assert_eq!(action("scss/_vars.scss"), Some(RuleAction::Task(AssetClass::Styles)));
    assert_eq!(action("js/main.es6"), Some(RuleAction::Task(AssetClass::Scripts)));
    assert_eq!(action("img/logo.svg"), Some(RuleAction::Task(AssetClass::Images)));
    assert_eq!(action("fonts/a.woff2"), Some(RuleAction::Task(AssetClass::Fonts)));
    assert_eq!(action("index.html"), Some(RuleAction::Reload));
    assert_eq!(action("views/page.php"), Some(RuleAction::Reload));
    assert_eq!(action("notes.txt"), None);
}

#[test]
fn test_route_ignores_dist_and_outside() {
    let (tmp, config) = make_config("");
    let router = router(&config);
    assert_eq!(router.route(&config.dist().join("css/style.scss")), None);
    assert_eq!(router.route(&tmp.path().join("other/style.scss")), None);
    assert_eq!(router.route(config.src()), None);
}

#[test]
fn test_disabled_class_has_no_rule() {
    let (_tmp, config) = make_config("[images]\nenable = false");
    let rules = build_rules(&config).unwrap();
    assert!(
        !rules
            .iter()
            .any(|r| r.action == RuleAction::Task(AssetClass::Images))
    );
}

#[test]
fn test_group_one_trigger_per_rule() {
    let (_tmp, config) = make_config("");
    let router = router(&config);
    let mut changes = rustc_hash::FxHashMap::default();
    changes.insert(config.src().join("scss/b.scss"), ChangeKind::Modified);
    changes.insert(config.src().join("scss/a.scss"), ChangeKind::Created);
    changes.insert(config.src().join("index.html"), ChangeKind::Modified);
    changes.insert(config.dist().join("a.css"), ChangeKind::Modified);

    let grouped = router.group(changes);
    assert_eq!(grouped.len(), 2);
    assert_eq!(
        router.rules()[grouped[0].0].action,
        RuleAction::Task(AssetClass::Styles)
    );
    assert_eq!(grouped[0].1.paths, vec!["scss/a.scss", "scss/b.scss"]);
    assert_eq!(router.rules()[grouped[1].0].action, RuleAction::Reload);
}

// =============================================================================
// Dispatcher + workers
// =============================================================================

#[tokio::test]
async fn test_saved_twice_runs_once_and_reloads_once() {
    let (_tmp, config) = make_config("[watch]\ndebounce_ms = 20");
    let style = touch(&config, "scss/style.scss");
    let mut harness = Harness::new(&config);

    harness
        .dispatcher
        .on_event(&make_event(vec![&style], modify_kind()));
    harness
        .dispatcher
        .on_event(&make_event(vec![&style], modify_kind()));
    assert_eq!(
        harness.state_of(RuleAction::Task(AssetClass::Styles)),
        WatchState::Debouncing
    );
    assert_eq!(
        harness.state_of(RuleAction::Task(AssetClass::Scripts)),
        WatchState::Idle
    );

    tokio::time::sleep(Duration::from_millis(40)).await;
    harness.dispatcher.flush().unwrap();

    let (runs, messages) = harness.finish().await;
    assert_eq!(runs, 1);
    assert_eq!(messages.len(), 1);
    assert_eq!(reloads(&messages), 1);
}

#[tokio::test]
async fn test_lint_fix_write_back_does_not_retrigger() {
    let (_tmp, config) = make_config("[watch]\ndebounce_ms = 0");
    let style = touch(&config, "scss/style.scss");
    let mut harness = Harness::new(&config);

    harness
        .dispatcher
        .on_event(&make_event(vec![&style], modify_kind()));
    harness.dispatcher.flush().unwrap();

    // The run writes a fixed copy over the source it was triggered by.
    Dest::new(config.src())
        .process(FileEvent::new("scss/style.scss", ".a {\n  color: #fff;\n}\n"))
        .unwrap();
    harness
        .dispatcher
        .on_event(&make_event(vec![&style], modify_kind()));
    harness.dispatcher.flush().unwrap();

    let (runs, messages) = harness.finish().await;
    assert_eq!(runs, 1);
    assert_eq!(messages.len(), 1);
    assert_eq!(reloads(&messages), 1);
}

#[tokio::test]
async fn test_unrelated_change_runs_nothing() {
    let (_tmp, config) = make_config("[watch]\ndebounce_ms = 0");
    let notes = touch(&config, "notes.txt");
    let mut harness = Harness::new(&config);

    harness
        .dispatcher
        .on_event(&make_event(vec![&notes], modify_kind()));
    harness.dispatcher.flush().unwrap();

    let (runs, messages) = harness.finish().await;
    assert_eq!(runs, 0);
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_reload_rule_skips_task() {
    let (_tmp, config) = make_config("[watch]\ndebounce_ms = 0");
    let page = touch(&config, "index.html");
    let mut harness = Harness::new(&config);

    harness
        .dispatcher
        .on_event(&make_event(vec![&page], modify_kind()));
    harness.dispatcher.flush().unwrap();

    let (runs, messages) = harness.finish().await;
    assert_eq!(runs, 0);
    assert_eq!(reloads(&messages), 1);
}

#[tokio::test]
async fn test_pending_triggers_coalesce() {
    let (_tmp, config) = make_config("[watch]\ndebounce_ms = 0");
    let harness = Harness::new(&config);
    let styles = harness
        .dispatcher
        .handles
        .iter()
        .find(|h| h.action == RuleAction::Task(AssetClass::Styles))
        .unwrap();

    // Nothing has yielded to the workers yet: the first trigger takes the
    // slot and the rest merge into it.
    for name in ["a.scss", "b.scss", "c.scss"] {
        assert!(styles.dispatch(crate::actor::messages::Trigger {
            paths: vec![name.to_string()],
        }));
    }

    let (runs, messages) = harness.finish().await;
    assert_eq!(runs, 1);
    assert_eq!(reloads(&messages), 1);
}

#[tokio::test]
async fn test_failure_shows_error_then_clears() {
    let (_tmp, config) = make_config("[watch]\ndebounce_ms = 0");
    let style = touch(&config, "style.scss");
    let mut harness = Harness::new(&config);

    harness.runner.fail.store(true, Ordering::SeqCst);
    harness
        .dispatcher
        .on_event(&make_event(vec![&style], modify_kind()));
    harness.dispatcher.flush().unwrap();

    let error = harness.ws_rx.recv().await.unwrap();
    match error {
        WsMsg::Error { path, error } => {
            assert_eq!(path, "style.scss");
            assert!(error.contains("expected"));
        }
        other => panic!("expected error message, got {other:?}"),
    }
    // The failure was reported, monitoring continues.
    tokio::task::yield_now().await;
    assert_eq!(
        harness.state_of(RuleAction::Task(AssetClass::Styles)),
        WatchState::Idle
    );

    harness.runner.fail.store(false, Ordering::SeqCst);
    harness
        .dispatcher
        .on_event(&make_event(vec![&style], modify_kind()));
    harness.dispatcher.flush().unwrap();

    let (runs, messages) = harness.finish().await;
    assert_eq!(runs, 2);
    assert!(matches!(messages[0], WsMsg::ClearError));
    assert!(matches!(messages[1], WsMsg::Reload { .. }));
}
