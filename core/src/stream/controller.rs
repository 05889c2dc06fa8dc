//! The streaming message controller: one logical live message per session.
//!
//! High-frequency append/replace requests coalesce last-write-wins into a
//! bounded-rate sequence of edits. When content outgrows the per-message
//! limit the current message is closed at a paragraph boundary and a new
//! live message carries the remainder; when `finalize` runs the message is
//! sealed and later content opens a fresh one.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::messenger::{ChatRef, EditOutcome, MessageRef, Messenger};
use crate::render::{split_for_sending, MESSAGE_LIMIT};

use super::limits::EditLimiter;

/// State of the current live message.
#[derive(Debug)]
struct LiveMessage {
    /// Unset until the first successful send.
    message: Option<MessageRef>,
    /// What the messenger currently shows.
    sent: String,
    /// What it should show next (last-write-wins buffer).
    pending: String,
    /// Bumped on replace/finalize so a stale in-flight edit can drop itself.
    generation: u64,
    /// Close the message once `sent` catches up with `pending`.
    finalize_requested: bool,
    finalized: bool,
    /// The message still shows an interstitial placeholder; the first real
    /// content replaces it instead of appending below it.
    placeholder: bool,
    last_edit: Option<Instant>,
    /// When the pending buffer last changed; streaming edits wait for the
    /// buffer to sit still (finalize does not).
    last_content_change: Option<Instant>,
    /// Backoff deadline from an API `Throttled` response.
    blocked_until: Option<Instant>,
}

impl LiveMessage {
    fn new(pending: String) -> Self {
        LiveMessage {
            message: None,
            sent: String::new(),
            pending,
            generation: 0,
            finalize_requested: false,
            finalized: false,
            placeholder: false,
            last_edit: None,
            last_content_change: None,
            blocked_until: None,
        }
    }
}

/// Per-session controller owning the live message for one chat.
pub struct StreamingController<M: Messenger> {
    api: Arc<M>,
    chat: ChatRef,
    limiter: EditLimiter,
    live: Option<LiveMessage>,
    /// Message bodies queued behind an overflow rollover, oldest first.
    overflow: VecDeque<String>,
}

impl<M: Messenger> StreamingController<M> {
    pub fn new(api: Arc<M>, chat: ChatRef, limiter: EditLimiter) -> Self {
        StreamingController {
            api,
            chat,
            limiter,
            live: None,
            overflow: VecDeque::new(),
        }
    }

    /// Whether a live (non-finalized) message currently exists.
    pub fn has_live(&self) -> bool {
        self.live
            .as_ref()
            .map(|live| !live.finalized)
            .unwrap_or(false)
    }

    /// The live message id, once the first send landed.
    pub fn live_message(&self) -> Option<MessageRef> {
        self.live
            .as_ref()
            .filter(|live| !live.finalized)
            .and_then(|live| live.message)
    }

    /// Start a fresh live message showing a placeholder (e.g. "Thinking…").
    pub async fn open_placeholder(&mut self, html: &str) {
        let mut live = LiveMessage::new(html.to_string());
        live.placeholder = true;
        self.live = Some(live);
        self.try_flush().await;
    }

    /// Concatenate to the pending buffer; flush subject to debounce and
    /// rate limits.
    pub async fn append(&mut self, html: &str) {
        if html.trim().is_empty() {
            return;
        }
        let live = self.ensure_live();
        if live.placeholder {
            live.pending.clear();
            live.placeholder = false;
        }
        if live.pending.is_empty() {
            live.pending = html.to_string();
        } else {
            live.pending.push('\n');
            live.pending.push_str(html);
        }
        live.last_content_change = Some(Instant::now());
        self.try_flush().await;
    }

    /// Supersede the pending buffer wholesale and flush eagerly.
    pub async fn replace(&mut self, html: &str) {
        if self.live.is_none() && html.trim().is_empty() {
            return;
        }
        let live = self.ensure_live();
        live.pending = html.to_string();
        live.generation += 1;
        live.last_content_change = Some(Instant::now());
        self.try_flush().await;
    }

    /// Seal the live message. Later appends open a new one.
    pub async fn finalize(&mut self) {
        let Some(live) = self.live.as_mut() else {
            return;
        };
        if live.finalized {
            return;
        }
        live.finalize_requested = true;
        live.generation += 1;
        self.try_flush().await;
    }

    /// Replace content and seal in one step (the finalize re-render path).
    pub async fn replace_and_finalize(&mut self, html: &str) {
        if !html.trim().is_empty() {
            let live = self.ensure_live();
            live.pending = html.to_string();
            live.generation += 1;
        }
        self.finalize().await;
    }

    /// Termination path: replace with the final render and seal, skipping
    /// the debounce (no more ticks will come to retry).
    pub async fn finalize_now(&mut self, html: &str) {
        if !html.trim().is_empty() {
            let live = self.ensure_live();
            live.pending = html.to_string();
            live.generation += 1;
        }
        if let Some(live) = self.live.as_mut() {
            live.last_edit = None;
            live.last_content_change = None;
            live.blocked_until = None;
        }
        self.finalize().await;
    }

    /// Retry any deferred flush; called once per poll tick.
    pub async fn pump(&mut self) {
        self.try_flush().await;
    }

    fn ensure_live(&mut self) -> &mut LiveMessage {
        let stale = self
            .live
            .as_ref()
            .map(|live| live.finalized)
            .unwrap_or(true);
        if stale {
            self.live = Some(LiveMessage::new(String::new()));
        }
        self.live.as_mut().unwrap()
    }

    async fn try_flush(&mut self) {
        loop {
            let Some(live) = self.live.as_mut() else {
                return;
            };
            if live.finalized {
                return;
            }

            // Overflow rollover: close this message with the first chunk,
            // queue the rest for follow-up messages.
            if live.pending.chars().count() > MESSAGE_LIMIT {
                let mut parts = split_for_sending(&live.pending, MESSAGE_LIMIT).into_iter();
                if let Some(head) = parts.next() {
                    live.pending = head;
                }
                for part in parts.rev() {
                    self.overflow.push_front(part);
                }
                let live = self.live.as_mut().unwrap();
                live.finalize_requested = true;
            }

            let live = self.live.as_mut().unwrap();
            let now = Instant::now();
            let dirty = live.pending != live.sent;

            if !dirty && !live.finalize_requested {
                return;
            }

            // Nothing was ever sent and there is nothing to say: sealing is
            // a pure state change.
            if live.message.is_none() && live.pending.trim().is_empty() {
                if live.finalize_requested {
                    live.finalized = true;
                    if !self.advance_overflow() {
                        return;
                    }
                    continue;
                }
                return;
            }

            if let Some(blocked) = live.blocked_until {
                if now < blocked {
                    return;
                }
                live.blocked_until = None;
            }

            // The per-message interval gates edits only; the initial send
            // of a message is not an edit.
            if dirty && live.message.is_some() {
                if let Some(last) = live.last_edit {
                    if now.duration_since(last) < self.limiter.per_message_interval() {
                        return;
                    }
                }
                // Let a streaming burst settle before editing; the finalize
                // re-render goes out as soon as the other gates allow.
                if !live.finalize_requested {
                    if let Some(changed) = live.last_content_change {
                        if now.duration_since(changed) < self.limiter.stream_debounce() {
                            return;
                        }
                    }
                }
            }

            if !dirty && live.finalize_requested {
                // Content already on screen: sealing needs no API call.
                live.finalized = true;
                if !self.advance_overflow() {
                    return;
                }
                continue;
            }

            if !self.limiter.try_acquire_global() {
                debug!("global edit window exhausted, deferring flush");
                return;
            }

            let live = self.live.as_mut().unwrap();
            let generation = live.generation;
            let payload = live.pending.clone();

            match live.message {
                None => match self.api.send_text(self.chat, &payload).await {
                    Ok(message) => {
                        let live = self.live.as_mut().unwrap();
                        if live.generation != generation {
                            continue;
                        }
                        live.message = Some(message);
                        live.sent = payload;
                        live.last_edit = Some(Instant::now());
                    }
                    Err(err) => {
                        warn!(error = %err, "live message send failed");
                        return;
                    }
                },
                Some(message) => {
                    let outcome = self.api.edit_text(self.chat, message, &payload).await;
                    let live = self.live.as_mut().unwrap();
                    if live.generation != generation {
                        continue;
                    }
                    match outcome {
                        EditOutcome::Ok | EditOutcome::NotModified => {
                            live.sent = payload;
                            live.last_edit = Some(Instant::now());
                        }
                        EditOutcome::Throttled { retry_after } => {
                            live.blocked_until =
                                Some(Instant::now() + clamp_backoff(retry_after));
                            return;
                        }
                        EditOutcome::Fatal { description } => {
                            // The message is gone or unusable; stop editing
                            // it rather than hot-looping.
                            warn!(%description, "fatal edit outcome, sealing message");
                            live.sent = payload;
                            live.finalized = true;
                            if !self.advance_overflow() {
                                return;
                            }
                            continue;
                        }
                    }
                }
            }

            let live = self.live.as_mut().unwrap();
            if live.finalize_requested && live.sent == live.pending {
                live.finalized = true;
                if !self.advance_overflow() {
                    return;
                }
                continue;
            }
            return;
        }
    }

    /// Promote the next queued overflow chunk to a fresh live message.
    /// Returns false when there is nothing queued.
    fn advance_overflow(&mut self) -> bool {
        match self.overflow.pop_front() {
            Some(body) => {
                let mut next = LiveMessage::new(body);
                // Intermediate chunks seal as soon as they land; only the
                // last one stays editable.
                next.finalize_requested = !self.overflow.is_empty();
                self.live = Some(next);
                true
            }
            None => false,
        }
    }
}

fn clamp_backoff(retry_after: Duration) -> Duration {
    retry_after.clamp(Duration::from_secs(1), Duration::from_secs(60))
}
