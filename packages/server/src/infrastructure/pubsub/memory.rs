//! プロセス内 PubSubTransport 実装
//!
//! `tokio::sync::broadcast` をチャンネル名ごとに 1 本持ちます。
//! clone したハンドルは同じチャンネル群を共有するため、
//! テストでは 1 つの InMemoryTransport を 2 つの PubSubBridge に渡すことで
//! 「別インスタンス」を再現できます。
//!
//! `set_available(false)` で障害を模擬できます。既存の購読ストリームは終了し、
//! 復旧するまで publish / subscribe は失敗します。

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use futures_util::{StreamExt, stream};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::domain::{MessageStream, PubSubTransport, TransportError};

/// チャンネルごとのバッファ容量の既定値
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

struct Inner {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
    available: AtomicBool,
    capacity: usize,
}

/// プロセス内 pub/sub
#[derive(Clone)]
pub struct InMemoryTransport {
    inner: Arc<Inner>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                channels: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
                capacity: capacity.max(1),
            }),
        }
    }

    /// 障害・復旧を模擬する
    ///
    /// `false` にすると全チャンネルが破棄され、既存の購読ストリームは終了する。
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::Release);
        if !available {
            self.lock_channels().clear();
            tracing::warn!("In-memory transport marked unavailable");
        } else {
            tracing::info!("In-memory transport marked available");
        }
    }

    /// チャンネルの現在の購読者数
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock_channels()
            .get(channel)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    fn ensure_available(&self) -> Result<(), TransportError> {
        if self.inner.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::Unavailable(
                "in-memory transport is down".to_string(),
            ))
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.lock_channels()
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.inner.capacity).0)
            .clone()
    }

    fn lock_channels(&self) -> std::sync::MutexGuard<'_, HashMap<String, broadcast::Sender<String>>> {
        self.inner
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PubSubTransport for InMemoryTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), TransportError> {
        self.ensure_available()?;
        // 購読者がいない場合の送信失敗は Redis の PUBLISH が 0 を返すのと同じ扱い
        let receivers = self.sender(channel).send(payload).unwrap_or(0);
        tracing::trace!("Published to '{}' ({} subscribers)", channel, receivers);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        self.ensure_available()?;
        let receiver = self.sender(channel).subscribe();
        let channel = channel.to_string();

        let messages = stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(message) => return Some((message, receiver)),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(
                                "Subscriber on '{}' lagged, {} messages skipped",
                                channel,
                                skipped
                            );
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(messages.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const CHANNEL: &str = "notifications";

    #[tokio::test]
    async fn test_publish_reaches_every_subscriber() {
        // テスト項目: 発行したメッセージが全購読者に届く
        // given (前提条件):
        let transport = InMemoryTransport::new();
        let mut first = transport.subscribe(CHANNEL).await.unwrap();
        let mut second = transport.clone().subscribe(CHANNEL).await.unwrap();

        // when (操作):
        transport.publish(CHANNEL, "hello".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(first.next().await.as_deref(), Some("hello"));
        assert_eq!(second.next().await.as_deref(), Some("hello"));
        assert_eq!(transport.subscriber_count(CHANNEL), 2);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        // テスト項目: 購読者がいなくても publish は成功する
        // given (前提条件):
        let transport = InMemoryTransport::new();

        // when (操作):
        let result = transport.publish(CHANNEL, "nobody".to_string()).await;

        // then (期待する結果):
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        // テスト項目: 別チャンネルのメッセージは届かない
        // given (前提条件):
        let transport = InMemoryTransport::new();
        let mut other = transport.subscribe("other").await.unwrap();

        // when (操作):
        transport.publish(CHANNEL, "hello".to_string()).await.unwrap();

        // then (期待する結果):
        let received = tokio::time::timeout(Duration::from_millis(20), other.next()).await;
        assert!(received.is_err());
    }

    #[tokio::test]
    async fn test_outage_ends_streams_and_fails_fast() {
        // テスト項目: 障害中は publish / subscribe が即座に失敗し、既存ストリームは終了する
        // given (前提条件):
        let transport = InMemoryTransport::new();
        let mut stream = transport.subscribe(CHANNEL).await.unwrap();

        // when (操作):
        transport.set_available(false);

        // then (期待する結果):
        assert_eq!(stream.next().await, None);
        assert!(matches!(
            transport.publish(CHANNEL, "x".to_string()).await,
            Err(TransportError::Unavailable(_))
        ));
        assert!(transport.subscribe(CHANNEL).await.is_err());

        transport.set_available(true);
        assert!(transport.subscribe(CHANNEL).await.is_ok());
    }
}
