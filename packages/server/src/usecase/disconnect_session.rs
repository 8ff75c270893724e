//! UseCase: セッション切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectSessionUseCase::execute() メソッド（1 セッションの登録解除）
//! - DisconnectSessionUseCase::force_logout() メソッド（ユーザーの全セッションを閉じる）
//!
//! ### なぜこのテストが必要か
//! - 切断は冪等であり、他のセッションに影響しないことを保証
//! - 強制ログアウトでは即座に切断せず Closing を経由する（バッファ済みの通知を流す）ことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：1 セッションの切断
//! - エッジケース：同じセッションの二重切断
//! - 正常系：複数セッションを持つユーザーの強制ログアウト
//! - エッジケース：接続していないユーザーの強制ログアウト

use std::sync::Arc;

use crate::{
    domain::{Connection, UserId},
    infrastructure::ConnectionRegistry,
};

/// セッション切断のユースケース
pub struct DisconnectSessionUseCase {
    registry: Arc<ConnectionRegistry>,
}

impl DisconnectSessionUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// セッションを登録解除し Closed にする
    ///
    /// 既に解除済みなら何もせず `false` を返す。
    pub async fn execute(&self, connection: &Connection) -> bool {
        let removed = self
            .registry
            .deregister(connection.user_id(), connection.session_id())
            .await;
        if removed {
            tracing::info!(
                user_id = %connection.user_id(),
                session_id = %connection.session_id(),
                delivered = connection.delivered_count(),
                "Session deregistered"
            );
        }
        removed
    }

    /// ユーザーの全セッションに graceful close を要求する
    ///
    /// 各セッションは送信済みバッファを流した後、自身で登録解除する。
    /// 戻り値は close を要求したセッション数。
    pub async fn force_logout(&self, user_id: &UserId) -> usize {
        let closed = self.registry.close_user(user_id).await;
        tracing::info!(user_id = %user_id, sessions = closed, "Forced logout requested");
        closed
    }
}
