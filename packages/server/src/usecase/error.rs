//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{PublishError, RegistryError, ValueObjectError};

/// セッション接続時のエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConnectError {
    #[error("server is shutting down")]
    ShuttingDown,
}

impl From<RegistryError> for ConnectError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::ShuttingDown => ConnectError::ShuttingDown,
        }
    }
}

/// 通知発行リクエストのエラー
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PublishNotificationError {
    #[error("invalid target user id: {0}")]
    InvalidTarget(#[from] ValueObjectError),

    #[error("unknown notification kind: {0}")]
    UnknownKind(String),

    #[error("notification bridge unavailable: {0}")]
    BridgeUnavailable(String),

    #[error("failed to encode notification: {0}")]
    Encode(String),
}

impl From<PublishError> for PublishNotificationError {
    fn from(error: PublishError) -> Self {
        match error {
            PublishError::UnknownKind(kind) => PublishNotificationError::UnknownKind(kind),
            PublishError::BridgeUnavailable(e) => {
                PublishNotificationError::BridgeUnavailable(e.to_string())
            }
            PublishError::Encode(e) => PublishNotificationError::Encode(e),
        }
    }
}
