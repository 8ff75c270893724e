//! Pub/sub envelope DTO.
//!
//! The same JSON encoding is used for publishing and subscribing.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification as carried over the shared pub/sub channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEnvelope {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    /// Kind tag, validated when the envelope is decoded into a domain notification
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    pub created_at: i64,
    /// Instance that published the notification (log correlation only)
    pub origin: String,
}

impl NotificationEnvelope {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
