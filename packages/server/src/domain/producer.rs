//! NotificationProducer trait 定義
//!
//! ビジネスサービス（フレンド申請、イベント更新など）が通知を発行するための唯一の入口です。
//! 具体的な実装（PubSubBridge）は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{entity::Notification, error::PublishError};

/// 通知の発行者インターフェース
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationProducer: Send + Sync {
    /// 通知を発行する
    ///
    /// トランスポートがダウンしている場合は `PublishError::BridgeUnavailable` を返す。
    /// 無期限にブロックすることはない。
    async fn publish(&self, notification: Notification) -> Result<(), PublishError>;
}

/// fail-open で通知を発行する
///
/// ライブ通知の失敗で元のビジネス操作を失敗させてはならないため、
/// エラーはログに残して握りつぶす。発行できた場合は `true`。
pub async fn publish_or_log(
    producer: &dyn NotificationProducer,
    notification: Notification,
) -> bool {
    let id = notification.id();
    let kind = notification.kind();
    match producer.publish(notification).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                notification_id = %id,
                kind = %kind,
                "Live-push notification dropped: {}",
                e
            );
            false
        }
    }
}
