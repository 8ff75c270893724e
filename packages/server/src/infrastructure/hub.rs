//! BroadcastHub: インスタンス内のファンアウト
//!
//! ## 責務
//!
//! - 通知の宛先接続を ConnectionRegistry から解決する（宛先なし = 全接続）
//! - 各接続への配信を独立して試みる（遅い・壊れた接続が他を止めない）
//! - 配信に失敗した接続は切断扱いとしてレジストリから削除する（リトライしない）
//!
//! ## 順序
//!
//! 接続ごとに送信キューは 1 本だけなので、同じ Hub に順に dispatch された通知は
//! その順序で届きます。接続間・インスタンス間の順序は保証しません。

use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use futures_util::future::join_all;

use crate::{
    domain::{Connection, DeliveryError, Notification, NotificationId},
    infrastructure::{dto::websocket::NotificationMessage, registry::ConnectionRegistry},
};

/// 1 回の dispatch の結果（ログ・テスト用）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// 解決された宛先接続の数
    pub targets: usize,
    /// 配信に成功した接続の数
    pub delivered: usize,
    /// 配信に失敗し、レジストリから削除された接続の数
    pub evicted: usize,
    /// 既に dispatch 済みの ID だったため破棄された
    pub duplicate: bool,
}

/// 最近 dispatch した通知 ID の窓（at-least-once 再送の吸収）
struct RecentIds {
    capacity: usize,
    order: VecDeque<NotificationId>,
    seen: HashSet<NotificationId>,
}

impl RecentIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// 初めて見る ID なら記録して `true`
    fn insert(&mut self, id: NotificationId) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.seen.remove(&oldest);
        }
        true
    }
}

/// インスタンス内ブロードキャストハブ
pub struct BroadcastHub {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
    recent: Mutex<RecentIds>,
}

impl BroadcastHub {
    /// # Arguments
    ///
    /// * `send_timeout` - バッファ満杯の接続に対して待つ最大時間
    /// * `dedup_window` - 重複排除のために記憶する通知 ID の数（0 で無効）
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration, dedup_window: usize) -> Self {
        Self {
            registry,
            send_timeout,
            recent: Mutex::new(RecentIds::new(dedup_window)),
        }
    }

    /// 通知を宛先の全接続に配信する
    ///
    /// Producer にエラーを返すことはない。宛先が無ければ何もしない。
    pub async fn dispatch(&self, notification: &Notification) -> DispatchReport {
        if !self.remember(notification.id()) {
            tracing::debug!(
                "Notification '{}' already dispatched, dropping duplicate",
                notification.id()
            );
            return DispatchReport {
                duplicate: true,
                ..DispatchReport::default()
            };
        }

        let targets = match notification.target_user_id() {
            Some(user_id) => self.registry.lookup(user_id).await,
            None => self.registry.snapshot_all().await,
        };
        if targets.is_empty() {
            tracing::debug!(
                "No live connection for notification '{}' ({}), dropping",
                notification.id(),
                notification.kind()
            );
            return DispatchReport::default();
        }

        let message = match serde_json::to_string(&NotificationMessage::from(notification)) {
            Ok(json) => Arc::new(json),
            Err(e) => {
                tracing::warn!(
                    "Failed to encode notification '{}': {}",
                    notification.id(),
                    e
                );
                return DispatchReport {
                    targets: targets.len(),
                    ..DispatchReport::default()
                };
            }
        };

        let outcomes = join_all(
            targets
                .iter()
                .map(|connection| connection.deliver(message.clone(), self.send_timeout)),
        )
        .await;

        let mut report = DispatchReport {
            targets: targets.len(),
            ..DispatchReport::default()
        };
        for (connection, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    if self.evict(connection, e).await {
                        report.evicted += 1;
                    }
                }
            }
        }

        tracing::debug!(
            "Dispatched notification '{}' ({}): {}/{} delivered, {} evicted",
            notification.id(),
            notification.kind(),
            report.delivered,
            report.targets,
            report.evicted
        );
        report
    }

    fn remember(&self, id: NotificationId) -> bool {
        match self.recent.lock() {
            Ok(mut recent) => recent.insert(id),
            Err(poisoned) => poisoned.into_inner().insert(id),
        }
    }

    /// 配信できなかった接続を切断扱いにする
    async fn evict(&self, connection: &Connection, reason: DeliveryError) -> bool {
        // Closing 中の接続は自分で flush して削除するので触らない
        if reason == DeliveryError::NotOpen {
            return false;
        }
        tracing::warn!(
            "Evicting session '{}' of user '{}': {}",
            connection.session_id(),
            connection.user_id(),
            reason
        );
        self.registry
            .deregister(connection.user_id(), connection.session_id())
            .await
    }
}
