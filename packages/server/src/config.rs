//! Server configuration.
//!
//! Every flag can also be supplied through the environment (the binary loads
//! `.env` first). `ServerArgs` is converted into the plain `ServerConfig` the
//! rest of the crate consumes; tests build `ServerConfig` directly.

use std::time::Duration;

use clap::Parser;

use crate::infrastructure::BridgeConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "teamup-server")]
#[command(about = "Real-time notification server (WebSocket fan-out over pub/sub)", long_about = None)]
pub struct ServerArgs {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "API_PORT", default_value_t = 3003)]
    pub port: u16,

    /// Redis URL for the shared notification channel (in-process transport when absent)
    #[arg(long, env = "REDIS_URL")]
    pub redis_url: Option<String>,

    /// Name of the shared pub/sub channel
    #[arg(long, env = "NOTIFY_CHANNEL", default_value = "notifications")]
    pub channel: String,

    /// Outbound buffer capacity per connection
    #[arg(long, env = "OUTBOUND_BUFFER", default_value_t = 64)]
    pub outbound_buffer: usize,

    /// How long a delivery may wait on a full outbound buffer
    #[arg(long, env = "SEND_TIMEOUT_MS", default_value_t = 50)]
    pub send_timeout_ms: u64,

    /// How long a publish may wait on the transport
    #[arg(long, env = "PUBLISH_TIMEOUT_MS", default_value_t = 500)]
    pub publish_timeout_ms: u64,

    /// How long a closing session may spend flushing buffered messages
    #[arg(long, env = "CLOSE_FLUSH_MS", default_value_t = 1000)]
    pub close_flush_ms: u64,

    /// Overall budget for graceful shutdown
    #[arg(long, env = "SHUTDOWN_TIMEOUT_MS", default_value_t = 5000)]
    pub shutdown_timeout_ms: u64,

    /// Initial resubscribe backoff
    #[arg(
        long,
        env = "BACKOFF_MIN_MS",
        default_value_t = 100,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub backoff_min_ms: u64,

    /// Maximum resubscribe backoff
    #[arg(long, env = "BACKOFF_MAX_MS", default_value_t = 10_000)]
    pub backoff_max_ms: u64,

    /// Number of recent notification ids remembered for duplicate suppression (0 disables)
    #[arg(long, env = "DEDUP_WINDOW", default_value_t = 1024)]
    pub dedup_window: usize,

    /// Identifier of this instance in logs and envelopes (random when absent)
    #[arg(long, env = "INSTANCE_ID")]
    pub instance_id: Option<String>,
}

/// Resolved runtime configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub redis_url: Option<String>,
    pub channel: String,
    pub instance_id: String,
    pub outbound_buffer: usize,
    pub send_timeout: Duration,
    pub publish_timeout: Duration,
    pub close_flush: Duration,
    pub shutdown_timeout: Duration,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub dedup_window: usize,
}

impl ServerConfig {
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            channel: self.channel.clone(),
            instance_id: self.instance_id.clone(),
            publish_timeout: self.publish_timeout,
            backoff_min: self.backoff_min,
            backoff_max: self.backoff_max,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3003,
            redis_url: None,
            channel: "notifications".to_string(),
            instance_id: uuid::Uuid::new_v4().to_string(),
            outbound_buffer: 64,
            send_timeout: Duration::from_millis(50),
            publish_timeout: Duration::from_millis(500),
            close_flush: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
            backoff_min: Duration::from_millis(100),
            backoff_max: Duration::from_secs(10),
            dedup_window: 1024,
        }
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            redis_url: args.redis_url.filter(|url| !url.trim().is_empty()),
            channel: args.channel,
            instance_id: args
                .instance_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            outbound_buffer: args.outbound_buffer.max(1),
            send_timeout: Duration::from_millis(args.send_timeout_ms),
            publish_timeout: Duration::from_millis(args.publish_timeout_ms),
            close_flush: Duration::from_millis(args.close_flush_ms),
            shutdown_timeout: Duration::from_millis(args.shutdown_timeout_ms),
            backoff_min: Duration::from_millis(args.backoff_min_ms),
            backoff_max: Duration::from_millis(args.backoff_max_ms),
            dedup_window: args.dedup_window,
        }
    }
}
