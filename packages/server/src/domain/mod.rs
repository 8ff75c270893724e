//! Domain 層
//!
//! 通知配信の中核となる型と、Infrastructure 層が実装する trait を定義します。
//!
//! - `value_object`: UserId, SessionId など
//! - `entity`: Notification
//! - `connection`: 1 つのクライアント接続
//! - `producer`: NotificationProducer trait（通知の唯一の書き込み口）
//! - `transport`: PubSubTransport trait（インスタンス間の共有チャンネル）

pub mod connection;
pub mod entity;
pub mod error;
pub mod producer;
pub mod transport;
pub mod value_object;

pub use connection::{Connection, ConnectionState, OutboundReceiver};
pub use entity::{Notification, NotificationKind};
pub use error::{DeliveryError, PublishError, RegistryError, TransportError, ValueObjectError};
pub use producer::{NotificationProducer, publish_or_log};
pub use transport::{MessageStream, PubSubTransport};
pub use value_object::{NotificationId, SessionId, Timestamp, UserId};
