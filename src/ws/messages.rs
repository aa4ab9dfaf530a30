//! WebSocket message types: envelope and commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsMessage {
    /// Client-provided ID for requests; server-generated for events.
    pub id: String,
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: WsMessageType,
    /// ISO-8601 timestamp. Optional on client messages.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Variant-specific payload.
    pub payload: serde_json::Value,
}

impl WsMessage {
    /// Builds a server message stamped with the current time.
    #[must_use]
    pub fn new(id: String, msg_type: WsMessageType, payload: serde_json::Value) -> Self {
        Self {
            id,
            msg_type,
            timestamp: Utc::now(),
            payload,
        }
    }
}

/// Discriminator for WebSocket message types.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WsMessageType {
    /// Client → Server command.
    Command,
    /// Server → Client response to a command.
    Response,
    /// Server → Client broadcast event.
    Event,
    /// Server → Client error.
    Error,
}

/// Commands a client can send in the `payload` of a `command` message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WsCommand {
    /// Receive events for these users. `"*"` subscribes to every user.
    Subscribe {
        /// User ids to follow.
        user_ids: Vec<String>,
    },
    /// Stop receiving events for these users.
    Unsubscribe {
        /// User ids to drop.
        user_ids: Vec<String>,
    },
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn parses_subscribe_command() {
        let cmd: Option<WsCommand> =
            serde_json::from_str(r#"{"command":"subscribe","user_ids":["u1","*"]}"#).ok();
        assert_eq!(
            cmd,
            Some(WsCommand::Subscribe {
                user_ids: vec!["u1".to_string(), "*".to_string()]
            })
        );
    }

    #[test]
    fn unknown_command_fails() {
        let cmd: Result<WsCommand, _> = serde_json::from_str(r#"{"command":"purge"}"#);
        assert!(cmd.is_err());
    }
}
