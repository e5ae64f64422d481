use std::io::ErrorKind;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use crate::reload::message::ReloadMessage;

use super::WsActor;

/// Poll interval of the reader thread.
const READ_POLL: Duration = Duration::from_millis(100);

impl WsActor {
    /// Handshake, greet, replay the pending error, then register.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // Blocking during handshake, non-blocking afterwards for polling reads.
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("reload"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        if let Err(e) = ws.send(Self::text(&ReloadMessage::connected())) {
            crate::log!("reload"; "failed to send connected message: {}", e);
            return;
        }

        if let Some(pending) = &self.pending_error {
            let message = ReloadMessage::error(&pending.path, &pending.error);
            match ws.send(Self::text(&message)) {
                Ok(()) => crate::debug!("reload"; "sent pending error to new client"),
                Err(e) => crate::log!("reload"; "failed to send pending error: {}", e),
            }
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("reload"; "client connected (total: {})", clients.len());
    }

    /// Background thread: drain client frames and drop closed connections.
    pub(super) fn client_reader_loop(clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>) {
        loop {
            std::thread::sleep(READ_POLL);
            if crate::core::is_shutdown() {
                break;
            }

            clients.lock().retain_mut(|ws| match ws.read() {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(tungstenite::Error::Io(ref e)) if e.kind() == ErrorKind::WouldBlock => true,
                Err(e) => {
                    crate::debug!("reload"; "client dropped: {}", e);
                    false
                }
            });
        }
    }
}
