//! Random movie relay: an HTTP endpoint and a Telegram bot over one movie store.

pub mod config;
pub mod relay;
pub mod server;
