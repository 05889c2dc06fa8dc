//! The Telegram-facing layer: API client, keyboards, commands, updates.

pub mod client;
pub mod commands;
pub mod keyboards;
pub mod updates;
