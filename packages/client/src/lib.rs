//! CLI listener for TeamUp real-time notifications.

pub mod error;
pub mod formatter;
pub mod runner;
pub mod session;
