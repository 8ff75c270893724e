//! PubSubTransport の実装
//!
//! - `redis`: Redis PUBLISH / SUBSCRIBE を使った実装（複数インスタンス構成）
//! - `memory`: プロセス内の broadcast チャンネルを使った実装（単一インスタンス・テスト用）

pub mod memory;
pub mod redis;

pub use memory::InMemoryTransport;
pub use redis::RedisTransport;
