//! Server execution logic.

use std::{future::Future, sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{delete, get, post},
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    domain::{NotificationProducer, PubSubTransport},
    infrastructure::{BroadcastHub, ConnectionRegistry, PubSubBridge},
    usecase::{
        ConnectSessionUseCase, DisconnectSessionUseCase, GetPresenceUseCase,
        PublishNotificationUseCase,
    },
};

use super::{
    handler::{
        close_sessions, get_presence, get_user_presence, health_check, publish_notification,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Real-time notification server
///
/// Owns one registry, one hub and one bridge. The bridge's subscription loop
/// runs for the lifetime of `serve`.
///
/// # Example
///
/// ```ignore
/// let transport = Arc::new(InMemoryTransport::new());
/// Server::new(ServerConfig::default(), transport).run().await?;
/// ```
pub struct Server {
    config: ServerConfig,
    transport: Arc<dyn PubSubTransport>,
    registry: Arc<ConnectionRegistry>,
}

impl Server {
    pub fn new(config: ServerConfig, transport: Arc<dyn PubSubTransport>) -> Self {
        Self {
            config,
            transport,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Live sessions of this instance. Stays valid after `serve` returns.
    pub fn registry(&self) -> Arc<ConnectionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Bind to the configured host and port and serve until Ctrl+C / SIGTERM
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// Shutdown order: stop accepting and ask every session to close, wait for
    /// the registry to drain, cancel the subscription loop, release the transport.
    /// The whole sequence is bounded by `shutdown_timeout`.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = self.config;
        let registry = self.registry;

        // Initialize dependencies in order:
        // 1. Hub / Bridge
        // 2. UseCases
        // 3. AppState
        let hub = Arc::new(BroadcastHub::new(
            Arc::clone(&registry),
            config.send_timeout,
            config.dedup_window,
        ));
        let bridge = Arc::new(PubSubBridge::new(self.transport, config.bridge_config()));
        let producer: Arc<dyn NotificationProducer> = bridge.clone();

        let app_state = Arc::new(AppState {
            connect_session_usecase: Arc::new(ConnectSessionUseCase::new(
                Arc::clone(&registry),
                config.outbound_buffer,
            )),
            disconnect_session_usecase: Arc::new(DisconnectSessionUseCase::new(Arc::clone(
                &registry,
            ))),
            publish_notification_usecase: Arc::new(PublishNotificationUseCase::new(producer)),
            get_presence_usecase: Arc::new(GetPresenceUseCase::new(Arc::clone(&registry))),
            registry: Arc::clone(&registry),
            bridge: Arc::clone(&bridge),
            close_flush: config.close_flush,
        });

        let subscription_shutdown = CancellationToken::new();
        let subscription = bridge.spawn_subscription(hub, subscription_shutdown.clone());

        let app = router(app_state);

        tracing::info!(
            "Notification server listening on {} (instance {})",
            listener.local_addr()?,
            config.instance_id
        );
        tracing::info!("Connect to: ws://{}/ws?user_id=<id>", listener.local_addr()?);

        let closing_registry = Arc::clone(&registry);
        let graceful = async move {
            shutdown.await;
            tracing::info!("Shutdown requested, closing live sessions");
            closing_registry.close_all().await;
        };

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(graceful)
            .await;

        let deadline = tokio::time::Instant::now() + config.shutdown_timeout;
        // serve can also return on an accept error, in which case sessions are still open
        registry.close_all().await;
        drain_sessions(&registry, deadline).await;

        subscription_shutdown.cancel();
        let mut subscription = subscription;
        if tokio::time::timeout_at(deadline, &mut subscription)
            .await
            .is_err()
        {
            tracing::warn!("Subscription loop did not stop within the shutdown budget");
            subscription.abort();
        }
        drop(bridge);

        tracing::info!("Server shutdown complete");
        served.map_err(ServerError::from)
    }
}

/// Build the HTTP / WebSocket router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .route("/api/presence", get(get_presence))
        .route("/api/presence/{user_id}", get(get_user_presence))
        .route("/api/notifications", post(publish_notification))
        .route("/api/sessions/{user_id}", delete(close_sessions))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wait until every session has deregistered itself, forcing the rest out at the deadline
async fn drain_sessions(registry: &ConnectionRegistry, deadline: tokio::time::Instant) {
    const POLL_INTERVAL: Duration = Duration::from_millis(10);

    while registry.count().await > 0 {
        if tokio::time::Instant::now() >= deadline {
            let remaining = registry.snapshot_all().await;
            tracing::warn!(
                "{} sessions still open at the shutdown deadline, removing them",
                remaining.len()
            );
            for connection in remaining {
                registry
                    .deregister(connection.user_id(), connection.session_id())
                    .await;
            }
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    tracing::info!("All sessions closed");
}
