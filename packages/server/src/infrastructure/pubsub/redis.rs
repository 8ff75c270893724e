//! Redis を使った PubSubTransport 実装
//!
//! - publish: `ConnectionManager`（自動再接続、複数タスクから clone して同時に使える）
//! - subscribe: 購読ごとに専用の pub/sub 接続を開く
//!
//! 購読接続が切れるとストリームが終了し、PubSubBridge がバックオフ付きで再購読します。

use async_trait::async_trait;
use futures_util::StreamExt;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::domain::{MessageStream, PubSubTransport, TransportError};

/// Redis pub/sub トランスポート
#[derive(Clone)]
pub struct RedisTransport {
    client: redis::Client,
    publisher: ConnectionManager,
}

impl RedisTransport {
    /// Redis に接続する
    ///
    /// # Arguments
    ///
    /// * `url` - 接続 URL（例: `redis://127.0.0.1:6379`）
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let publisher = ConnectionManager::new(client.clone())
            .await
            .map_err(unavailable)?;

        tracing::info!("Connected to Redis at {}", redacted(url));
        Ok(Self { client, publisher })
    }
}

#[async_trait]
impl PubSubTransport for RedisTransport {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), TransportError> {
        let mut connection = self.publisher.clone();
        let receivers: i64 = connection
            .publish(channel, payload)
            .await
            .map_err(unavailable)?;
        tracing::trace!("Published to '{}' ({} subscribers)", channel, receivers);
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError> {
        let mut pubsub = self.client.get_async_pubsub().await.map_err(unavailable)?;
        pubsub.subscribe(channel).await.map_err(unavailable)?;

        let messages = pubsub.into_on_message().filter_map(|message| async move {
            match message.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    tracing::warn!(
                        "Dropping non-text message on '{}': {}",
                        message.get_channel_name(),
                        e
                    );
                    None
                }
            }
        });
        Ok(messages.boxed())
    }
}

fn unavailable(error: redis::RedisError) -> TransportError {
    TransportError::Unavailable(error.to_string())
}

/// URL 中の認証情報をログに出さない
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
