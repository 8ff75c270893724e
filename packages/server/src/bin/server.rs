//! Real-time notification server.
//!
//! Business services publish notifications (via `POST /api/notifications` or a
//! linked `NotificationProducer`); every instance subscribed to the shared
//! channel pushes them to the matching WebSocket clients.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin teamup-server
//! cargo run --bin teamup-server -- --host 0.0.0.0 --port 3003 --redis-url redis://127.0.0.1:6379
//! ```

use std::sync::Arc;

use clap::Parser;
use teamup_server::{
    config::{ServerArgs, ServerConfig},
    domain::PubSubTransport,
    infrastructure::pubsub::{InMemoryTransport, RedisTransport},
    ui::Server,
};
use teamup_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Failed to load .env: {}", e);
    }

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let config = ServerConfig::from(ServerArgs::parse());

    let transport: Arc<dyn PubSubTransport> = match &config.redis_url {
        Some(url) => match RedisTransport::connect(url).await {
            Ok(transport) => Arc::new(transport),
            Err(e) => {
                tracing::error!("Failed to connect to Redis: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!("No Redis URL configured, using the in-process transport (single instance only)");
            Arc::new(InMemoryTransport::new())
        }
    };

    if let Err(e) = Server::new(config, transport).run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
