//! Infrastructure 層
//!
//! Domain 層の trait の実装と、接続管理・配信の仕組みを提供します。
//!
//! - `registry`: ConnectionRegistry（ユーザー ID ごとのライブ接続）
//! - `hub`: BroadcastHub（ローカル接続への配信）
//! - `bridge`: PubSubBridge（インスタンス間の通知の橋渡し）
//! - `pubsub`: PubSubTransport の実装（Redis / プロセス内）
//! - `dto`: ワイヤーフォーマット

pub mod bridge;
pub mod dto;
pub mod hub;
pub mod pubsub;
pub mod registry;

pub use bridge::{Backoff, BridgeConfig, PubSubBridge};
pub use hub::{BroadcastHub, DispatchReport};
pub use registry::ConnectionRegistry;
