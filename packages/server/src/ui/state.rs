//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::{
    infrastructure::{ConnectionRegistry, PubSubBridge},
    usecase::{
        ConnectSessionUseCase, DisconnectSessionUseCase, GetPresenceUseCase,
        PublishNotificationUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectSessionUseCase（セッション接続のユースケース）
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    /// DisconnectSessionUseCase（セッション切断・強制ログアウトのユースケース）
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    /// PublishNotificationUseCase（通知発行のユースケース）
    pub publish_notification_usecase: Arc<PublishNotificationUseCase>,
    /// GetPresenceUseCase（在席状況取得のユースケース）
    pub get_presence_usecase: Arc<GetPresenceUseCase>,
    /// Registry, for the accepting flag checked before an upgrade
    pub registry: Arc<ConnectionRegistry>,
    /// Bridge, for health reporting
    pub bridge: Arc<PubSubBridge>,
    /// Budget a closing session has to flush its buffered messages
    pub close_flush: Duration,
}
