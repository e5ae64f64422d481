//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use crossbeam::channel::Receiver;
use tiny_http::Server;

use super::{RequestContext, ServeError, handle_request};
use crate::actor::Coordinator;
use crate::config::ProjectConfig;
use crate::log;

const REQUEST_THREADS: usize = 4;

/// Bind the HTTP server. A taken port is an error, never retried.
pub(super) fn bind_http(interface: IpAddr, port: u16) -> Result<(Server, SocketAddr), ServeError> {
    let addr = SocketAddr::new(interface, port);
    let server = Server::http(addr).map_err(|e| ServeError::Bind {
        addr,
        message: e.to_string(),
    })?;
    // Port 0 binds an ephemeral port; report the real one.
    let addr = server.server_addr().to_ip().unwrap_or(addr);
    Ok((server, addr))
}

/// Bind the reload WebSocket listener.
pub(super) fn bind_ws(interface: IpAddr, port: u16) -> Result<TcpListener, ServeError> {
    let addr = SocketAddr::new(interface, port);
    TcpListener::bind(addr).map_err(|e| ServeError::Bind {
        addr,
        message: e.to_string(),
    })
}

/// Spawn the actor system for file watching and live reload.
pub(super) fn spawn_actors(
    config: Arc<ProjectConfig>,
    ws_listener: TcpListener,
    shutdown_rx: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || run_actor_system(config, ws_listener, shutdown_rx))
}

fn run_actor_system(
    config: Arc<ProjectConfig>,
    ws_listener: TcpListener,
    shutdown_rx: Receiver<()>,
) {
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            log!("actor"; "failed to start runtime: {}", e);
            return;
        }
    };

    rt.block_on(async {
        let coordinator = Coordinator::with_config(config)
            .with_ws_listener(ws_listener)
            .with_shutdown_signal(shutdown_rx);
        if let Err(e) = coordinator.run().await {
            log!("actor"; "error: {:#}", e);
        }
    });
}

/// Serve requests on a small pool until the server is unblocked.
pub(super) fn run_request_loop(server: &Server, ctx: Arc<RequestContext>) -> Result<()> {
    // A slow proxy target must not stall other requests.
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(REQUEST_THREADS)
        .build()?;

    for request in server.incoming_requests() {
        let ctx = Arc::clone(&ctx);
        pool.spawn(move || {
            if let Err(e) = handle_request(request, &ctx) {
                log!("serve"; "request error: {e}");
            }
        });
    }
    Ok(())
}

/// Wait for actor system to shutdown gracefully (max 2 seconds).
pub(super) fn wait_for_shutdown(handle: JoinHandle<()>) {
    for _ in 0..40 {
        if handle.is_finished() {
            let _ = handle.join();
            return;
        }
        thread::sleep(Duration::from_millis(50));
    }
}
