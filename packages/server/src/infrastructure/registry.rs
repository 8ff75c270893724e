//! ConnectionRegistry: 生きている接続の唯一の記録
//!
//! ## 責務
//!
//! - `UserId → { SessionId → Connection }` の対応を所有する
//! - 接続ライフサイクルの変更（登録・削除）はここでのみ行う
//! - 「このユーザーは今到達可能か」に答える
//!
//! ## 並行性
//!
//! 単一の `RwLock` で保護します。登録・削除は書き込みロック、参照は読み取りロック。
//! ロックを保持したまま接続への送信を待つことはありません（スナップショットを返す）。
//!
//! 削除と `Closed` への遷移は同じ書き込みロックの中で行うため、
//! `lookup` が Closed の接続を返すことはありません。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::sync::RwLock;

use crate::domain::{Connection, RegistryError, SessionId, UserId};

type Sessions = HashMap<SessionId, Arc<Connection>>;

/// 接続レジストリ
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<UserId, Sessions>>,
    accepting: AtomicBool,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// 接続を登録する
    ///
    /// 同じユーザーの既存セッションには影響しない（マルチセッション）。
    /// 戻った時点で以降の `lookup` から見える。
    pub async fn register(&self, connection: Arc<Connection>) -> Result<(), RegistryError> {
        let mut connections = self.connections.write().await;
        if !self.accepting.load(Ordering::Acquire) {
            return Err(RegistryError::ShuttingDown);
        }

        let user_id = connection.user_id().clone();
        let session_id = connection.session_id();
        connections
            .entry(user_id.clone())
            .or_default()
            .insert(session_id, connection);

        tracing::debug!(
            "Session '{}' of user '{}' registered ({} live sessions)",
            session_id,
            user_id,
            count_sessions(&connections)
        );
        Ok(())
    }

    /// セッションを 1 つ削除し、`Closed` に遷移させる
    ///
    /// 既に存在しない場合は何もしない（切断の競合に対して冪等）。
    /// 実際に削除した場合は `true`。
    pub async fn deregister(&self, user_id: &UserId, session_id: SessionId) -> bool {
        let mut connections = self.connections.write().await;

        let Some(sessions) = connections.get_mut(user_id) else {
            return false;
        };
        let Some(connection) = sessions.remove(&session_id) else {
            return false;
        };
        connection.mark_closed();
        if sessions.is_empty() {
            connections.remove(user_id);
        }

        tracing::debug!(
            "Session '{}' of user '{}' deregistered ({} live sessions)",
            session_id,
            user_id,
            count_sessions(&connections)
        );
        true
    }

    /// ユーザーの接続のスナップショットを返す
    ///
    /// 返された後に接続が閉じられることがあるため、送信側は失敗を許容すること。
    pub async fn lookup(&self, user_id: &UserId) -> Vec<Arc<Connection>> {
        let connections = self.connections.read().await;
        connections
            .get(user_id)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 全接続のスナップショット（ブロードキャスト用）
    pub async fn snapshot_all(&self) -> Vec<Arc<Connection>> {
        let connections = self.connections.read().await;
        connections
            .values()
            .flat_map(|sessions| sessions.values().cloned())
            .collect()
    }

    /// 生きているセッションの総数
    pub async fn count(&self) -> usize {
        count_sessions(&*self.connections.read().await)
    }

    /// ユーザーのセッション数
    pub async fn session_count(&self, user_id: &UserId) -> usize {
        let connections = self.connections.read().await;
        connections.get(user_id).map_or(0, HashMap::len)
    }

    /// 1 つ以上の接続を持つユーザー（ソート済み）
    pub async fn online_users(&self) -> Vec<UserId> {
        let connections = self.connections.read().await;
        let mut users: Vec<UserId> = connections.keys().cloned().collect();
        users.sort();
        users
    }

    /// ユーザーの全セッションに close を要求する（強制ログアウト）
    ///
    /// 実際の削除は各セッションが flush を終えてから行う。
    /// close を要求できたセッション数を返す。
    pub async fn close_user(&self, user_id: &UserId) -> usize {
        self.lookup(user_id)
            .await
            .iter()
            .filter(|connection| connection.request_close())
            .count()
    }

    /// 新規登録を止め、全セッションに close を要求する（シャットダウン）
    pub async fn close_all(&self) -> usize {
        let snapshot = {
            let connections = self.connections.write().await;
            self.accepting.store(false, Ordering::Release);
            connections
                .values()
                .flat_map(|sessions| sessions.values().cloned())
                .collect::<Vec<_>>()
        };

        let requested = snapshot
            .iter()
            .filter(|connection| connection.request_close())
            .count();
        tracing::info!("Requested close on {} live sessions", requested);
        requested
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn count_sessions(connections: &HashMap<UserId, Sessions>) -> usize {
    connections.values().map(HashMap::len).sum()
}
