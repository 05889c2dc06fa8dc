//! The contract the bot layer implements against the chat API.
//!
//! The core never talks to Telegram directly: the pipeline and streaming
//! controller are written against this trait, which keeps them testable
//! with a recording mock and keeps the HTTP client swappable.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::CoreError;

/// A chat the bridge is talking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChatRef(pub i64);

/// A message inside a chat, as the API names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef(pub i32);

/// Result taxonomy for edit attempts. The chat API reports rate limits and
/// no-op edits as errors; the controller treats them as ordinary outcomes,
/// so they are modelled as values rather than exceptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Edit applied.
    Ok,
    /// Content identical to what the message already shows.
    NotModified,
    /// Rate-limited; retry no earlier than the given delay.
    Throttled { retry_after: Duration },
    /// Permanent API rejection (bad markup, message deleted, …).
    Fatal { description: String },
}

/// One inline-keyboard button: label shown to the user and the callback
/// data returned when tapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Button {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Everything the core needs from the chat API. All payloads are already
/// HTML-escaped by the renderer.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send a new HTML message; returns its id for later edits.
    async fn send_text(&self, chat: ChatRef, html: &str) -> Result<MessageRef, CoreError>;

    /// Edit a message in place. Infallible in the `Result` sense: every
    /// failure mode is an `EditOutcome`.
    async fn edit_text(&self, chat: ChatRef, message: MessageRef, html: &str) -> EditOutcome;

    /// Send a new message carrying an inline keyboard (one button per row).
    async fn send_keyboard(
        &self,
        chat: ChatRef,
        html: &str,
        buttons: &[Button],
    ) -> Result<MessageRef, CoreError>;

    /// Strip the inline keyboard from a previously sent message.
    async fn remove_keyboard(&self, chat: ChatRef, message: MessageRef) -> Result<(), CoreError>;

    /// Acknowledge a callback query, optionally with a toast text.
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>)
        -> Result<(), CoreError>;

    /// Delete a message outright.
    async fn delete_message(&self, chat: ChatRef, message: MessageRef) -> Result<(), CoreError>;

    /// Upload a document from disk.
    async fn send_document(
        &self,
        chat: ChatRef,
        path: &Path,
        caption: Option<&str>,
    ) -> Result<MessageRef, CoreError>;

    /// Show the "typing…" indicator.
    async fn typing(&self, chat: ChatRef) -> Result<(), CoreError>;
}
