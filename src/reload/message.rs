//! Reload Message Protocol
//!
//! JSON messages sent over the reload WebSocket. The embedded client reacts
//! to `reload`, `error` and `clear_error`.

use serde::{Deserialize, Serialize};

/// Message sent to browser clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Reload the page.
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Connection established.
    Connected { version: String },

    /// Rebuild failed (display overlay, no reload).
    Error { path: String, error: String },

    /// Rebuild succeeded after an error.
    ClearError,
}

impl ReloadMessage {
    pub fn reload(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn connected() -> Self {
        Self::Connected {
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn error(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            path: path.into(),
            error: error.into(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reload_message() {
        let json = ReloadMessage::reload("styles rebuilt").to_json();
        assert_eq!(json, r#"{"type":"reload","reason":"styles rebuilt"}"#);
    }

    #[test]
    fn test_error_message() {
        let json = ReloadMessage::error("scss/a.scss", "expected \";\"").to_json();
        assert!(json.contains(r#""type":"error""#));
        assert!(json.contains(r#""path":"scss/a.scss""#));
        let parsed: ReloadMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ReloadMessage::error("scss/a.scss", "expected \";\""));
    }

    #[test]
    fn test_clear_error_tag() {
        assert_eq!(ReloadMessage::ClearError.to_json(), r#"{"type":"clear_error"}"#);
    }

    #[test]
    fn test_connected_carries_version() {
        let json = ReloadMessage::connected().to_json();
        assert!(json.contains(env!("CARGO_PKG_VERSION")));
    }
}
