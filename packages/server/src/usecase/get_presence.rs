//! UseCase: 在席状況の取得

use std::sync::Arc;

use crate::{domain::UserId, infrastructure::ConnectionRegistry};

/// インスタンス全体の在席状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceSummary {
    /// 1 つ以上のセッションを持つユーザー（ソート済み）
    pub online_users: Vec<UserId>,
    /// セッションの総数
    pub sessions: usize,
}

/// 在席状況取得のユースケース
///
/// このインスタンスに接続しているセッションのみを対象とする。
pub struct GetPresenceUseCase {
    registry: Arc<ConnectionRegistry>,
}

impl GetPresenceUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn summary(&self) -> PresenceSummary {
        PresenceSummary {
            online_users: self.registry.online_users().await,
            sessions: self.registry.count().await,
        }
    }

    /// ユーザーのセッション数（0 ならオフライン）
    pub async fn sessions_of(&self, user_id: &UserId) -> usize {
        self.registry.session_count(user_id).await
    }
}
