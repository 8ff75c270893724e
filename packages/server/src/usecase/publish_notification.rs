//! UseCase: 通知発行処理
//!
//! フレンド申請・イベント更新などのビジネス操作から届く生のリクエスト
//! （kind は文字列、宛先は任意）を検証し、Notification を組み立てて発行します。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - PublishNotificationUseCase::execute() メソッド
//! - リクエストの検証（kind, 宛先ユーザー ID）と NotificationProducer への委譲
//!
//! ### なぜこのテストが必要か
//! - 未知の kind は何も発行せずに拒否されることを保証
//! - 宛先の省略・空文字はブロードキャストになることを確認
//! - ブリッジ障害が呼び出し元に返されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：特定ユーザー宛ての発行
//! - 正常系：ブロードキャスト
//! - 異常系：未知の kind、長すぎる宛先、ブリッジ障害

use std::sync::Arc;

use crate::domain::{Notification, NotificationId, NotificationKind, NotificationProducer, UserId};

use super::error::PublishNotificationError;

/// 通知発行のユースケース
pub struct PublishNotificationUseCase {
    producer: Arc<dyn NotificationProducer>,
}

impl PublishNotificationUseCase {
    pub fn new(producer: Arc<dyn NotificationProducer>) -> Self {
        Self { producer }
    }

    /// 通知を検証して発行する
    ///
    /// # Arguments
    ///
    /// * `target_user_id` - 宛先ユーザー。`None`・空文字・空白のみならブロードキャスト
    /// * `kind` - 通知種別のワイヤー表記（例: `"friend_request_received"`）
    /// * `payload` - クライアントにそのまま渡す JSON
    ///
    /// # Returns
    ///
    /// * `Ok(NotificationId)` - 発行した通知の ID
    /// * `Err(PublishNotificationError)` - 検証失敗またはブリッジ障害
    pub async fn execute(
        &self,
        target_user_id: Option<String>,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<NotificationId, PublishNotificationError> {
        let kind: NotificationKind = kind.parse()?;
        let notification = match UserId::optional(target_user_id)? {
            Some(target) => Notification::to_user(target, kind, payload),
            None => Notification::broadcast(kind, payload),
        };
        let id = notification.id();

        self.producer.publish(notification).await?;
        Ok(id)
    }
}
