//! Actor Message Definitions
//!
//! ```text
//! FsActor --Trigger--> RuleWorker --WsMsg--> WsActor
//! ```

use std::net::TcpStream;

// =============================================================================
// RuleWorker Messages
// =============================================================================

/// One debounced batch of changes routed to a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    /// Changed paths, relative to the source root.
    pub paths: Vec<String>,
}

// =============================================================================
// WsActor Messages
// =============================================================================

/// Messages to WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Reload every connected page
    Reload { reason: String },
    /// Rebuild failed (display overlay, no reload)
    Error { path: String, error: String },
    /// Clear error overlay (rebuild succeeded after error)
    ClearError,
    /// Add client
    AddClient(TcpStream),
    /// Shutdown
    Shutdown,
}
