//! PubSubTransport trait 定義
//!
//! 複数のサーバーインスタンスが共有する外部 publish/subscribe チャンネルの抽象化です。
//! 契約: at-least-once、publisher ごとに順序を保存。
//!
//! 実装:
//! - `infrastructure::pubsub::RedisTransport`
//! - `infrastructure::pubsub::InMemoryTransport`（単一インスタンス・テスト用）

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::error::TransportError;

/// 受信メッセージ本文のストリーム
///
/// ストリームの終了はトランスポート切断を意味し、購読側は再接続する。
pub type MessageStream = BoxStream<'static, String>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// チャンネルにメッセージ本文を発行する
    async fn publish(&self, channel: &str, payload: String) -> Result<(), TransportError>;

    /// チャンネルを購読する
    ///
    /// 返されたストリームを drop すると購読リソースが解放される。
    async fn subscribe(&self, channel: &str) -> Result<MessageStream, TransportError>;
}
