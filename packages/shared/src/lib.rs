//! Utilities shared by the TeamUp notification server and its listener client.

pub mod logger;
pub mod time;
