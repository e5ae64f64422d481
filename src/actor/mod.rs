//! Actor System for Watch Mode
//!
//! Message-passing concurrency for `brook default`:
//!
//! ```text
//! FsActor --Trigger--> RuleWorker (one per rule) --Reload/Error--> WsActor
//! (watch)              (task on blocking pool)                   (broadcast)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing and rule routing
//! - `rule` - Per-rule workers and the watch state machine
//! - `ws` - WebSocket broadcast
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod rule;
pub mod ws;

pub use coordinator::Coordinator;
