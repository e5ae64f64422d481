//! WebSocket Actor
//!
//! This actor is responsible for:
//! - Managing WebSocket client connections
//! - Broadcasting reload and error messages to all connected clients
//! - Replaying the pending error to clients that connect late
//!
//! # Architecture
//!
//! ```text
//! RuleWorker --[Reload/Error]--> WsActor --[broadcast]--> Clients
//! ```

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::messages::WsMsg;
use crate::reload::message::ReloadMessage;

/// Error shown in the overlay until the failing rule rebuilds.
#[derive(Debug, Clone)]
struct PendingError {
    path: String,
    error: String,
}

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with the reader thread)
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    pending_error: Option<PendingError>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: None,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        std::thread::spawn(move || {
            Self::client_reader_loop(clients_for_reader);
        });

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Reload { reason } => {
                    crate::debug!("reload"; "sending reload: {}", reason);
                    self.broadcast(&ReloadMessage::reload(reason));
                }

                WsMsg::Error { path, error } => {
                    self.broadcast(&ReloadMessage::error(&path, &error));
                    self.pending_error = Some(PendingError { path, error });
                }

                WsMsg::ClearError => {
                    self.pending_error = None;
                    self.broadcast(&ReloadMessage::ClearError);
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("reload"; "shutting down");
                    for mut client in self.clients.lock().drain(..) {
                        let _ = client.close(None);
                    }
                    break;
                }
            }
        }
    }

    fn text(message: &ReloadMessage) -> Message {
        Message::Text(message.to_json().into())
    }
}
