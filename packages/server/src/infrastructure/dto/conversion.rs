//! Conversion logic between DTOs and domain entities.

use thiserror::Error;

use crate::domain::{
    Connection, Notification, NotificationId, NotificationKind, PublishError, Timestamp, UserId,
    ValueObjectError,
};
use crate::infrastructure::dto::{
    envelope::NotificationEnvelope,
    websocket::{MessageType, NotificationMessage, SessionOpenedMessage},
};

/// Failure to turn a received envelope back into a domain notification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Kind(#[from] PublishError),

    #[error("invalid target user id: {0}")]
    Target(#[from] ValueObjectError),
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Notification> for NotificationMessage {
    fn from(notification: &Notification) -> Self {
        Self {
            r#type: MessageType::Notification,
            id: notification.id().to_string(),
            kind: notification.kind().as_str().to_string(),
            payload: notification.payload().clone(),
            created_at: notification.created_at().value(),
        }
    }
}

impl From<&Connection> for SessionOpenedMessage {
    fn from(connection: &Connection) -> Self {
        Self {
            r#type: MessageType::SessionOpened,
            user_id: connection.user_id().as_str().to_string(),
            session_id: connection.session_id().to_string(),
            connected_at: connection.connected_at().value(),
        }
    }
}

impl NotificationEnvelope {
    /// Wrap a notification for the pub/sub channel
    pub fn from_notification(notification: &Notification, origin: &str) -> Self {
        Self {
            id: notification.id().as_uuid(),
            target_user_id: notification
                .target_user_id()
                .map(|user| user.as_str().to_string()),
            kind: notification.kind().as_str().to_string(),
            payload: notification.payload().clone(),
            created_at: notification.created_at().value(),
            origin: origin.to_string(),
        }
    }
}

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<NotificationEnvelope> for Notification {
    type Error = EnvelopeError;

    fn try_from(envelope: NotificationEnvelope) -> Result<Self, Self::Error> {
        let kind: NotificationKind = envelope.kind.parse()?;
        let target = UserId::optional(envelope.target_user_id)?;
        Ok(Notification::from_parts(
            NotificationId::from_uuid(envelope.id),
            target,
            kind,
            envelope.payload,
            Timestamp::new(envelope.created_at),
        ))
    }
}
