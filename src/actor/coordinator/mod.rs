//! Actor Coordinator - Wires up the Watch Actor System
//!
//! The Coordinator is a thin orchestrator that:
//! - Creates communication channels
//! - Builds one worker per watch rule
//! - Runs the actors concurrently until shutdown

mod runtime;

use std::net::TcpListener;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::Receiver;
use tokio::sync::mpsc;

use super::fs::{FsActor, build_rules};
use super::messages::WsMsg;
use super::rule::{RuleWorker, TaskRunner};
use super::ws::WsActor;
use crate::config::ProjectConfig;

const CHANNEL_BUFFER: usize = 32;

/// Coordinator - wires up and runs the actor system.
pub struct Coordinator {
    config: Arc<ProjectConfig>,
    ws_listener: Option<TcpListener>,
    shutdown_rx: Option<Receiver<()>>,
}

impl Coordinator {
    pub fn with_config(config: Arc<ProjectConfig>) -> Self {
        Self {
            config,
            ws_listener: None,
            shutdown_rx: None,
        }
    }

    /// Reload WebSocket listener, already bound by the dev server.
    pub fn with_ws_listener(mut self, listener: TcpListener) -> Self {
        self.ws_listener = Some(listener);
        self
    }

    /// Set shutdown signal receiver.
    pub fn with_shutdown_signal(mut self, rx: Receiver<()>) -> Self {
        self.shutdown_rx = Some(rx);
        self
    }

    /// Run the actor system.
    pub async fn run(mut self) -> Result<()> {
        let (ws_tx, ws_rx) = mpsc::channel::<WsMsg>(CHANNEL_BUFFER);

        if let Some(listener) = self.ws_listener.take() {
            crate::reload::server::spawn_acceptor(listener, ws_tx.clone())
                .context("reload acceptor failed")?;
        }

        let rules = build_rules(&self.config).context("invalid watch rule")?;
        let runner: Arc<dyn TaskRunner> = self.config.clone();
        let reload_delay = self.config.serve.reload_delay();

        let mut workers = Vec::with_capacity(rules.len());
        let mut handles = Vec::with_capacity(rules.len());
        for rule in &rules {
            crate::debug!("watch"; "rule {} -> {}", rule.pattern, rule.action);
            let (worker, handle) =
                RuleWorker::new(rule.action, Arc::clone(&runner), ws_tx.clone(), reload_delay);
            workers.push(worker);
            handles.push(handle);
        }

        let fs_actor = FsActor::new(&self.config, rules, handles)
            .map_err(|e| anyhow::anyhow!("watcher failed: {}", e))?;
        let ws_actor = WsActor::new(ws_rx);

        crate::debug!("actor"; "start");
        runtime::run_actors(fs_actor, workers, ws_actor, ws_tx, self.shutdown_rx.take()).await;
        crate::debug!("actor"; "stopped");
        Ok(())
    }
}
