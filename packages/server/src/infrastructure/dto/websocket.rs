//! WebSocket message DTOs.
//!
//! Every message sent to a client is one JSON text frame tagged by `type`.

use serde::{Deserialize, Serialize};

/// Message type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    SessionOpened,
    Notification,
}

/// Sent once to a client right after the upgrade handshake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOpenedMessage {
    pub r#type: MessageType,
    pub user_id: String,
    pub session_id: String,
    /// Unix timestamp (UTC, milliseconds)
    pub connected_at: i64,
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub r#type: MessageType,
    pub id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    /// Unix timestamp (UTC, milliseconds)
    pub created_at: i64,
}

/// Any message a client can receive
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    SessionOpened(SessionOpenedMessage),
    Notification(NotificationMessage),
}

impl ServerMessage {
    /// Parse a text frame received from the server
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
