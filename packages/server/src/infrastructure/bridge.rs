//! PubSubBridge: BroadcastHub と外部 pub/sub の橋渡し
//!
//! ## 責務
//!
//! - `publish`: 通知をシリアライズして共有チャンネルに発行する（NotificationProducer 実装）
//! - `run_subscription`: インスタンスごとに 1 本の購読ループ。全インスタンス（自分を含む）が
//!   発行した通知を受信し、ローカルの BroadcastHub に dispatch する
//!
//! インスタンス A で発行された通知が、インスタンス B に接続しているクライアントに届くのは
//! この購読ループのおかげです。
//!
//! ## 障害時の振る舞い
//!
//! - トランスポート切断時、購読ループは指数バックオフで再接続する
//! - 切断中の publish は即座に（または publish_timeout で）失敗する
//! - 切断中に発行された通知は再送しない

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{Notification, NotificationProducer, PubSubTransport, PublishError, TransportError},
    infrastructure::{dto::envelope::NotificationEnvelope, hub::BroadcastHub},
};

/// PubSubBridge の設定
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// 共有チャンネル名
    pub channel: String,
    /// このインスタンスの識別子（ログ相関用）
    pub instance_id: String,
    /// publish の最大待ち時間
    pub publish_timeout: Duration,
    /// 再接続バックオフの初期値
    pub backoff_min: Duration,
    /// 再接続バックオフの上限
    pub backoff_max: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel: "notifications".to_string(),
            instance_id: uuid::Uuid::new_v4().to_string(),
            publish_timeout: Duration::from_millis(500),
            backoff_min: Duration::from_millis(100),
            backoff_max: Duration::from_secs(10),
        }
    }
}

/// バックオフの下限（0 を指定しても再購読が空回りしないように）
pub const MIN_BACKOFF: Duration = Duration::from_millis(1);

/// 指数バックオフ
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let min = min.max(MIN_BACKOFF);
        let max = max.max(min);
        Self {
            min,
            max,
            current: min,
        }
    }

    /// 次の待ち時間を返し、内部の値を倍にする（上限あり）
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

/// 外部 pub/sub へのブリッジ
pub struct PubSubBridge {
    transport: Arc<dyn PubSubTransport>,
    config: BridgeConfig,
    subscribed: AtomicBool,
}

impl PubSubBridge {
    pub fn new(transport: Arc<dyn PubSubTransport>, config: BridgeConfig) -> Self {
        Self {
            transport,
            config,
            subscribed: AtomicBool::new(false),
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.config.instance_id
    }

    /// 購読ループが現在トランスポートに接続しているか
    pub fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::Acquire)
    }

    /// 購読ループを専用タスクで起動する
    pub fn spawn_subscription(
        self: &Arc<Self>,
        hub: Arc<BroadcastHub>,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let bridge = Arc::clone(self);
        tokio::spawn(async move { bridge.run_subscription(hub, shutdown).await })
    }

    /// 購読ループ本体
    ///
    /// `shutdown` がキャンセルされるまで戻らない。キャンセルは次のメッセージ待ちの間にのみ
    /// 反映され、処理中の dispatch は最後まで実行される。
    pub async fn run_subscription(&self, hub: Arc<BroadcastHub>, shutdown: CancellationToken) {
        let mut backoff = Backoff::new(self.config.backoff_min, self.config.backoff_max);
        tracing::info!(
            "Subscription loop started on channel '{}' (instance {})",
            self.config.channel,
            self.config.instance_id
        );

        while !shutdown.is_cancelled() {
            let subscribed = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.transport.subscribe(&self.config.channel) => result,
            };

            let mut messages = match subscribed {
                Ok(messages) => messages,
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!("Subscribe failed: {}. Retrying in {:?}", e, delay);
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            backoff.reset();
            self.subscribed.store(true, Ordering::Release);
            tracing::info!("Subscribed to channel '{}'", self.config.channel);

            loop {
                let next = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => None,
                    message = messages.next() => Some(message),
                };
                match next {
                    None => break,
                    Some(Some(body)) => self.forward(&hub, &body).await,
                    Some(None) => {
                        tracing::warn!(
                            "Subscription to '{}' lost, reconnecting",
                            self.config.channel
                        );
                        break;
                    }
                }
            }

            self.subscribed.store(false, Ordering::Release);
            if !shutdown.is_cancelled() {
                let delay = backoff.next_delay();
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        self.subscribed.store(false, Ordering::Release);
        tracing::info!("Subscription loop stopped");
    }

    async fn forward(&self, hub: &BroadcastHub, body: &str) {
        let envelope = match NotificationEnvelope::decode(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!("Skipping undecodable pub/sub message: {}", e);
                return;
            }
        };
        let origin = envelope.origin.clone();
        match Notification::try_from(envelope) {
            Ok(notification) => {
                tracing::debug!(
                    "Received notification '{}' from instance {}",
                    notification.id(),
                    origin
                );
                hub.dispatch(&notification).await;
            }
            Err(e) => tracing::warn!("Skipping invalid notification from {}: {}", origin, e),
        }
    }
}

#[async_trait]
impl NotificationProducer for PubSubBridge {
    async fn publish(&self, notification: Notification) -> Result<(), PublishError> {
        let body = NotificationEnvelope::from_notification(&notification, &self.config.instance_id)
            .encode()
            .map_err(|e| PublishError::Encode(e.to_string()))?;

        let published = tokio::time::timeout(
            self.config.publish_timeout,
            self.transport.publish(&self.config.channel, body),
        )
        .await
        .map_err(|_| {
            TransportError::Unavailable(format!(
                "publish timed out after {:?}",
                self.config.publish_timeout
            ))
        })?;
        published?;

        tracing::debug!(
            "Published notification '{}' ({}) to '{}'",
            notification.id(),
            notification.kind(),
            self.config.channel
        );
        Ok(())
    }
}
