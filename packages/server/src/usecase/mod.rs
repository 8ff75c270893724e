//! UseCase 層
//!
//! UI 層（WebSocket / HTTP ハンドラ）から呼び出されるアプリケーションロジックです。

mod connect_session;
mod disconnect_session;
mod error;
mod get_presence;
mod publish_notification;

pub use connect_session::ConnectSessionUseCase;
pub use disconnect_session::DisconnectSessionUseCase;
pub use error::{ConnectError, PublishNotificationError};
pub use get_presence::{GetPresenceUseCase, PresenceSummary};
pub use publish_notification::PublishNotificationUseCase;
