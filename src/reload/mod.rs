//! Reload Module
//!
//! WebSocket live reload for `brook default`.
//!
//! ```text
//! RuleWorker -> WsActor -> Browser
//!  (rebuild)  (broadcast)  (livereload.js)
//! ```
//!
//! # Modules
//!
//! - `message` - Reload message types (reload, error, clear_error)
//! - `server` - WebSocket acceptor feeding clients to the WsActor

pub mod message;
pub mod server;
