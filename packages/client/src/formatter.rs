//! Message formatting utilities for client display.

use teamup_server::infrastructure::dto::websocket::{NotificationMessage, SessionOpenedMessage};
use teamup_shared::time::millis_to_rfc3339;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format the greeting sent by the server right after the handshake
    pub fn format_session_opened(message: &SessionOpenedMessage) -> String {
        format!(
            "\n============================================================\n\
             Listening as '{}' (session {})\n\
             connected at {}\n\
             ============================================================\n",
            message.user_id,
            message.session_id,
            format_millis(message.connected_at)
        )
    }

    /// Format a delivered notification
    pub fn format_notification(message: &NotificationMessage) -> String {
        let payload = serde_json::to_string_pretty(&message.payload)
            .unwrap_or_else(|_| message.payload.to_string());
        format!(
            "\n------------------------------------------------------------\n\
             [{}] {}\n\
             {}\n\
             created at {}\n\
             ------------------------------------------------------------\n",
            message.kind,
            message.id,
            payload,
            format_millis(message.created_at)
        )
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

fn format_millis(millis: i64) -> String {
    millis_to_rfc3339(millis).unwrap_or_else(|| format!("{} ms", millis))
}
