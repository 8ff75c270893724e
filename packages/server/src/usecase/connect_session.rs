//! UseCase: セッション接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectSessionUseCase::execute() メソッド
//! - Connection の生成と ConnectionRegistry への登録
//!
//! ### なぜこのテストが必要か
//! - 登録直後から通知の配信対象になることを保証
//! - 同一ユーザーの複数セッション（複数タブ・複数端末）を許可することを確認
//! - シャットダウン開始後の接続を拒否することを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規セッションの登録
//! - 正常系：同一ユーザーの 2 つ目のセッション
//! - 異常系：シャットダウン中の接続

use std::sync::Arc;

use teamup_shared::time::{Clock, SystemClock};

use crate::{
    domain::{Connection, OutboundReceiver, Timestamp, UserId},
    infrastructure::ConnectionRegistry,
};

use super::error::ConnectError;

/// セッション接続のユースケース
pub struct ConnectSessionUseCase {
    registry: Arc<ConnectionRegistry>,
    /// 接続ごとの送信バッファ容量
    outbound_buffer: usize,
    /// 接続時刻の取得元
    clock: Arc<dyn Clock>,
}

impl ConnectSessionUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>, outbound_buffer: usize) -> Self {
        Self::with_clock(registry, outbound_buffer, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: Arc<ConnectionRegistry>,
        outbound_buffer: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            outbound_buffer,
            clock,
        }
    }

    /// 新しい Connection を Open 状態で作成し、登録する
    ///
    /// # Returns
    ///
    /// * `Ok((Connection, OutboundReceiver))` - 登録済みの接続と、その送信キューの受信側
    /// * `Err(ConnectError::ShuttingDown)` - シャットダウン開始後
    pub async fn execute(
        &self,
        user_id: UserId,
    ) -> Result<(Arc<Connection>, OutboundReceiver), ConnectError> {
        let connected_at = Timestamp::new(self.clock.now_millis());
        let (connection, outbound) =
            Connection::open_at(user_id, self.outbound_buffer, connected_at);
        self.registry.register(Arc::clone(&connection)).await?;

        tracing::info!(
            user_id = %connection.user_id(),
            session_id = %connection.session_id(),
            "Session registered"
        );
        Ok((connection, outbound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConnectionState;
    use teamup_shared::time::FixedClock;

    fn user(id: &str) -> UserId {
        UserId::new(id.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_connect_session_registers_open_connection() {
        // テスト項目: 接続したセッションは Open 状態で即座に lookup できる
        // given (前提条件):
        let registry = Arc::new(ConnectionRegistry::new());
        let usecase = ConnectSessionUseCase::new(registry.clone(), 8);

        // when (操作):
        let (connection, _outbound) = usecase.execute(user("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(connection.state(), ConnectionState::Open);
        let found = registry.lookup(&user("alice")).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].session_id(), connection.session_id());
    }

    #[tokio::test]
    async fn test_connect_session_stamps_connected_at_from_clock() {
        // テスト項目: 接続時刻は注入した Clock から取得される
        // given (前提条件):
        let registry = Arc::new(ConnectionRegistry::new());
        let clock = Arc::new(FixedClock::new(1_700_000_000_000));
        let usecase = ConnectSessionUseCase::with_clock(registry, 8, clock);

        // when (操作):
        let (connection, _outbound) = usecase.execute(user("alice")).await.unwrap();

        // then (期待する結果):
        assert_eq!(connection.connected_at().value(), 1_700_000_000_000);
    }

    #[tokio::test]
    async fn test_connect_session_allows_multiple_sessions_per_user() {
        // テスト項目: 同一ユーザーが複数セッションを持てる
        // given (前提条件):
        let registry = Arc::new(ConnectionRegistry::new());
        let usecase = ConnectSessionUseCase::new(registry.clone(), 8);

        // when (操作):
        let (first, _rx1) = usecase.execute(user("alice")).await.unwrap();
        let (second, _rx2) = usecase.execute(user("alice")).await.unwrap();

        // then (期待する結果):
        assert_ne!(first.session_id(), second.session_id());
        assert_eq!(registry.session_count(&user("alice")).await, 2);
    }

    #[tokio::test]
    async fn test_connect_session_rejected_during_shutdown() {
        // テスト項目: シャットダウン開始後の接続は拒否される
        // given (前提条件):
        let registry = Arc::new(ConnectionRegistry::new());
        registry.close_all().await;
        let usecase = ConnectSessionUseCase::new(registry.clone(), 8);

        // when (操作):
        let result = usecase.execute(user("alice")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::ShuttingDown)));
        assert_eq!(registry.count().await, 0);
    }
}
