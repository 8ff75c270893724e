//! Request handlers.

mod http;
mod websocket;

pub use http::{
    close_sessions, get_presence, get_user_presence, health_check, publish_notification,
};
pub use websocket::websocket_handler;
