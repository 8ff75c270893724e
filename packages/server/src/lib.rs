//! TeamUp real-time notification server.
//!
//! Tracks which users hold a live WebSocket connection and fans notifications
//! out to them, across server instances, through a shared pub/sub channel.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
