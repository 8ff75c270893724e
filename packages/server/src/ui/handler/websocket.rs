//! WebSocket session handlers.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::{Sink, SinkExt},
    stream::StreamExt,
};
use serde::Deserialize;

use crate::{
    domain::{Connection, ConnectionState, OutboundReceiver, UserId},
    infrastructure::dto::websocket::SessionOpenedMessage,
    ui::state::AppState,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Identity established by the authentication layer in front of this server
    pub user_id: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = match UserId::new(query.user_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejecting WebSocket handshake: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    if !state.registry.is_accepting() {
        tracing::warn!("Rejecting WebSocket handshake for '{}': shutting down", user_id);
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (connection, outbound) = match state.connect_session_usecase.execute(user_id).await {
        Ok(registered) => registered,
        Err(e) => {
            tracing::warn!("Session refused after handshake: {}", e);
            let _ = socket.send(close_message("server is shutting down")).await;
            return;
        }
    };

    let (mut sender, mut receiver) = socket.split();

    // The first frame a client sees is always session_opened
    let opened = SessionOpenedMessage::from(connection.as_ref());
    let sent = match serde_json::to_string(&opened) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode session_opened: {}", e);
            false
        }
    };
    if !sent {
        state.disconnect_session_usecase.execute(&connection).await;
        return;
    }

    let reader_connection = Arc::clone(&connection);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        session_id = %reader_connection.session_id(),
                        "Client requested close"
                    );
                    break;
                }
                Ok(Message::Text(text)) => {
                    tracing::debug!("Ignoring client text frame ({} bytes)", text.len());
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(
                        session_id = %reader_connection.session_id(),
                        "WebSocket read error: {}",
                        e
                    );
                    break;
                }
            }
        }
    });

    let mut send_task = pusher_loop(Arc::clone(&connection), outbound, sender, state.close_flush);

    // If any one of the tasks completes, deregister first, then abort the other
    tokio::select! {
        _ = &mut recv_task => {
            state.disconnect_session_usecase.execute(&connection).await;
            send_task.abort();
        }
        _ = &mut send_task => {
            state.disconnect_session_usecase.execute(&connection).await;
            recv_task.abort();
        }
    };
}

/// Spawns the writer task that drains the connection's outbound queue into the socket.
///
/// On a close request the task flushes whatever is already buffered (bounded by
/// `close_flush`) and sends a Close frame. When the connection was evicted it
/// stops without flushing, even if a socket write is still blocked.
fn pusher_loop<S>(
    connection: Arc<Connection>,
    mut outbound: OutboundReceiver,
    mut sender: S,
    close_flush: Duration,
) -> tokio::task::JoinHandle<()>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: Send,
{
    tokio::spawn(async move {
        let close_signal = connection.close_signal();
        loop {
            let text = tokio::select! {
                biased;
                _ = close_signal.cancelled() => break,
                message = outbound.recv() => match message {
                    Some(text) => text,
                    None => return,
                },
            };
            // A peer that stopped reading must not keep an evicted session alive
            tokio::select! {
                result = sender.send(Message::Text(text.as_str().into())) => {
                    if result.is_err() {
                        return;
                    }
                }
                _ = close_signal.cancelled() => break,
            }
        }

        if connection.state() != ConnectionState::Closing {
            return;
        }

        let flush = async {
            while let Ok(text) = outbound.try_recv() {
                if sender.send(Message::Text(text.as_str().into())).await.is_err() {
                    return;
                }
            }
            let _ = sender.send(close_message("session closed")).await;
        };
        if tokio::time::timeout(close_flush, flush).await.is_err() {
            tracing::warn!(
                session_id = %connection.session_id(),
                "Close flush exceeded {:?}, dropping remaining messages",
                close_flush
            );
        }
    })
}

fn close_message(reason: &'static str) -> Message {
    Message::Close(Some(CloseFrame {
        code: close_code::AWAY,
        reason: reason.into(),
    }))
}
