use std::time::Duration;

use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use crate::actor::fs::FsActor;
use crate::actor::messages::WsMsg;
use crate::actor::rule::RuleWorker;
use crate::actor::ws::WsActor;

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);
const WS_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

/// Run all actors concurrently.
pub(super) async fn run_actors(
    fs: FsActor,
    workers: Vec<RuleWorker>,
    ws: WsActor,
    ws_tx: mpsc::Sender<WsMsg>,
    shutdown_rx: Option<Receiver<()>>,
) {
    let ws_handle = tokio::spawn(ws.run());
    let worker_handles: Vec<_> = workers
        .into_iter()
        .map(|worker| tokio::spawn(worker.run()))
        .collect();
    let fs_handle = tokio::spawn(fs.run());

    if let Some(rx) = shutdown_rx {
        loop {
            if rx.try_recv().is_ok() || fs_handle.is_finished() {
                crate::debug!("actor"; "shutdown signal received");
                break;
            }
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
        fs_handle.abort();
    } else {
        let _ = fs_handle.await;
    }

    // Running tasks finish on the blocking pool; workers are not awaited.
    for handle in worker_handles {
        handle.abort();
    }

    let _ = ws_tx.send(WsMsg::Shutdown).await;
    let _ = tokio::time::timeout(WS_SHUTDOWN_TIMEOUT, ws_handle).await;
}
