//! Domain 層のエラー定義

use thiserror::Error;

/// Value Object の生成エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    UserIdEmpty,

    #[error("user id must be at most {0} characters")]
    UserIdTooLong(usize),
}

/// 外部 pub/sub トランスポートのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// 接続できない（ダウン中、タイムアウトなど）
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// 通知発行（Publish）のエラー
///
/// 呼び出し元はこれを fail-open として扱う（`producer::publish_or_log`）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    /// 未知の通知種別（一切ディスパッチされない）
    #[error("unknown notification kind: '{0}'")]
    UnknownKind(String),

    /// 外部トランスポートが利用できない
    #[error("notification bridge unavailable: {0}")]
    BridgeUnavailable(#[from] TransportError),

    /// 通知のシリアライズに失敗
    #[error("failed to encode notification: {0}")]
    Encode(String),
}

/// ConnectionRegistry のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// シャットダウン開始後は新しい接続を受け付けない
    #[error("registry is shutting down")]
    ShuttingDown,
}

/// 1 接続への配信失敗（Hub 内でのみ扱い、Producer には伝播しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("connection is not open")]
    NotOpen,

    #[error("outbound channel closed")]
    Closed,

    #[error("outbound buffer full")]
    Full,
}
