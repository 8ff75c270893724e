//! Data Transfer Objects (DTOs) for the notification server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: messages sent to connected clients
//! - `envelope`: notification body carried over the pub/sub transport
//! - `http`: HTTP API request/response bodies

pub mod conversion;
pub mod envelope;
pub mod http;
pub mod websocket;
