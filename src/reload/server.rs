//! WebSocket acceptor for live reload.
//!
//! The listener is bound once by the dev server. Accepted streams go to the
//! WsActor, which performs the handshake.

use std::net::TcpListener;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::actor::messages::WsMsg;

const ACCEPT_POLL: Duration = Duration::from_millis(100);

/// Spawn the acceptor thread. It stops on shutdown or once the WsActor is gone.
pub fn spawn_acceptor(listener: TcpListener, ws_tx: mpsc::Sender<WsMsg>) -> std::io::Result<()> {
    listener.set_nonblocking(true)?;

    std::thread::spawn(move || {
        while !crate::core::is_shutdown() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    crate::debug!("reload"; "client connected: {}", addr);

                    // WebSocket handshake runs in blocking mode.
                    let _ = stream.set_nonblocking(false);

                    if ws_tx.blocking_send(WsMsg::AddClient(stream)).is_err() {
                        crate::debug!("reload"; "actor gone, acceptor stopped");
                        break;
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    crate::log!("reload"; "accept error: {}", e);
                    std::thread::sleep(ACCEPT_POLL);
                }
            }
        }
    });

    Ok(())
}
