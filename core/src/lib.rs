//! Core library for claudegram — the engine that turns a Claude Code TUI
//! running on a PTY into a stream of rich-text message edits.
//!
//! # Architecture
//! - `term`: virtual terminal (40×120 attributed grid) with changed-row tracking
//! - `screen`: classifies a full display into one of 14 observations
//! - `render`: extracts content lines, groups semantic regions, renders HTML
//! - `pipeline`: per-session phase machine driving actions per observation
//! - `stream`: the live message controller (debounce, rate caps, overflow)
//! - `messenger`: the contract the bot layer implements against the chat API

#![deny(unsafe_code)]

pub mod error;
pub mod messenger;
pub mod pipeline;
pub mod render;
pub mod screen;
pub mod stream;
pub mod term;

pub use error::CoreError;
