//! WebSocket listener session.

use futures_util::StreamExt;
use teamup_server::infrastructure::dto::websocket::ServerMessage;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, protocol::Message},
};

use crate::{error::ClientError, formatter::MessageFormatter};

/// How a session ended without a transport failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server sent a Close frame (forced logout, shutdown)
    ClosedByServer,
    /// The user pressed Ctrl+C
    Interrupted,
}

/// Build the connection URL for a user
pub fn session_url(base_url: &str, user_id: &str) -> String {
    format!("{}?user_id={}", base_url, user_id)
}

/// Run one listener session until the server closes it, the user interrupts,
/// or the connection fails
pub async fn run_listener_session(url: &str, user_id: &str) -> Result<SessionEnd, ClientError> {
    let url = session_url(url, user_id);

    let (ws_stream, _response) = match connect_async(&url).await {
        Ok(result) => result,
        Err(WsError::Http(response)) => {
            return Err(ClientError::HandshakeRejected(response.status().as_u16()));
        }
        Err(e) => return Err(ClientError::ConnectionError(e.to_string())),
    };

    tracing::info!("Connected to notification server!");
    println!("\nWaiting for notifications. Press Ctrl+C to exit.\n");

    let (_write, mut read) = ws_stream.split();

    loop {
        let message = tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(SessionEnd::Interrupted),
            message = read.next() => message,
        };

        match message {
            Some(Ok(Message::Text(text))) => match ServerMessage::parse(&text) {
                Ok(ServerMessage::SessionOpened(opened)) => {
                    print!("{}", MessageFormatter::format_session_opened(&opened));
                }
                Ok(ServerMessage::Notification(notification)) => {
                    print!("{}", MessageFormatter::format_notification(&notification));
                }
                Err(_) => print!("{}", MessageFormatter::format_raw_message(&text)),
            },
            Some(Ok(Message::Binary(data))) => {
                print!("{}", MessageFormatter::format_binary_message(data.len()));
            }
            Some(Ok(Message::Close(frame))) => {
                match frame {
                    Some(frame) => tracing::info!("Server closed the session: {}", frame.reason.as_str()),
                    None => tracing::info!("Server closed the session"),
                }
                return Ok(SessionEnd::ClosedByServer);
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(ClientError::ConnectionError(e.to_string())),
            None => {
                return Err(ClientError::ConnectionError(
                    "Connection lost".to_string(),
                ));
            }
        }
    }
}
