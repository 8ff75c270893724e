//! Client execution logic with reconnection support.

use std::time::Duration;

use crate::{
    error::ClientError,
    session::{SessionEnd, run_listener_session},
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Run the listener with reconnection logic
///
/// A rejected handshake is not retried. A lost connection is retried up to
/// `MAX_RECONNECT_ATTEMPTS` times.
pub async fn run_client(url: &str, user_id: &str) -> Result<(), ClientError> {
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} as '{}' (attempt {}/{})",
            url,
            user_id,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_listener_session(url, user_id).await {
            Ok(SessionEnd::Interrupted) => {
                tracing::info!("Interrupted, exiting");
                return Ok(());
            }
            Ok(SessionEnd::ClosedByServer) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e @ ClientError::HandshakeRejected(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);
                reconnect_count += 1;

                if reconnect_count >= MAX_RECONNECT_ATTEMPTS {
                    return Err(ClientError::ReconnectExhausted(MAX_RECONNECT_ATTEMPTS));
                }

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count + 1,
                    MAX_RECONNECT_ATTEMPTS
                );

                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}
