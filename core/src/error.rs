//! Structured error types shared across the bridge.

use thiserror::Error;

/// Primary error type for claudegram operations
#[derive(Error, Debug)]
pub enum CoreError {
    // =========================================================================
    // Session Errors
    // =========================================================================
    /// Per-user session limit reached
    #[error("session limit reached (max {max_sessions} per user)")]
    SessionLimitReached { max_sessions: usize },

    /// Session not found
    #[error("session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// User has no active session to route to
    #[error("no active session")]
    NoActiveSession,

    /// The agent child process is gone
    #[error("agent process exited (session {session_id})")]
    ProcessGone { session_id: String },

    // =========================================================================
    // Messenger Errors
    // =========================================================================
    /// Chat API rejected a request
    #[error("messenger API error: {description}")]
    Messenger { description: String },

    /// Network-level failure talking to the chat API
    #[error("messenger network error: {description}")]
    MessengerNetwork { description: String },

    // =========================================================================
    // PTY Errors
    // =========================================================================
    /// Failed to open or drive the pseudo-terminal
    #[error("pty error: {description}")]
    Pty { description: String },

    // =========================================================================
    // Configuration Errors (fatal at startup)
    // =========================================================================
    /// A required configuration field is missing or invalid
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// The transition table failed its startup totality check
    #[error("transition table incomplete: {detail}")]
    TransitionTable { detail: String },
}

impl CoreError {
    /// Whether the error should be shown to the user as a chat message
    /// rather than only logged.
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            CoreError::SessionLimitReached { .. }
                | CoreError::SessionNotFound { .. }
                | CoreError::NoActiveSession
        )
    }
}
