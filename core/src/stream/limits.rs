//! Outbound edit-rate accounting.
//!
//! Two caps apply to the live-message traffic: a per-message minimum
//! interval between edits (the controller enforces it from its own
//! timestamps) and a process-wide sliding window over all outbound
//! send/edit calls, shared by every session through a cloned handle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Configuration for the outbound caps.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Minimum time between two edits of the same message.
    pub per_message_interval: Duration,
    /// Maximum outbound calls per minute across all chats.
    pub global_per_minute: u32,
    /// How long a streaming buffer must sit still before an edit goes out.
    /// Finalize bypasses this.
    pub stream_debounce: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_message_interval: Duration::from_secs(1),
            global_per_minute: 25,
            stream_debounce: Duration::from_millis(500),
        }
    }
}

/// Sliding one-minute window of outbound call timestamps.
#[derive(Debug)]
struct GlobalWindow {
    cap: u32,
    stamps: Vec<Instant>,
}

impl GlobalWindow {
    fn try_acquire(&mut self) -> bool {
        let cutoff = Instant::now() - Duration::from_secs(60);
        self.stamps.retain(|&stamp| stamp > cutoff);
        if self.stamps.len() as u32 >= self.cap {
            return false;
        }
        self.stamps.push(Instant::now());
        true
    }
}

/// Shared limiter handle. Cloning shares the global window; the
/// per-message interval is plain data.
#[derive(Debug, Clone)]
pub struct EditLimiter {
    per_message: Duration,
    stream_debounce: Duration,
    window: Arc<Mutex<GlobalWindow>>,
}

impl EditLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        EditLimiter {
            per_message: config.per_message_interval,
            stream_debounce: config.stream_debounce,
            window: Arc::new(Mutex::new(GlobalWindow {
                cap: config.global_per_minute,
                stamps: Vec::new(),
            })),
        }
    }

    pub fn per_message_interval(&self) -> Duration {
        self.per_message
    }

    pub fn stream_debounce(&self) -> Duration {
        self.stream_debounce
    }

    /// Check the global window and, if allowed, record one outbound call.
    pub fn try_acquire_global(&self) -> bool {
        self.window.lock().try_acquire()
    }
}

impl Default for EditLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}
