//! HTTP / WebSocket server.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::{Server, ServerError, router};
pub use signal::shutdown_signal;
