//! The closed action vocabulary the runner can perform on a transition.

/// One atomic pipeline action. The set is closed: the transition table can
/// only name these, and the runner matches exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Start the typing indicator and open a placeholder live message.
    SendThinking,
    /// Run the incremental extraction and append to the live message.
    ExtractAndSend,
    /// Re-render from the full screen, replace the live message, seal it.
    Finalize,
    /// Send the tool-approval inline keyboard as a new message (one-shot).
    SendKeyboard,
    /// Send the authentication warning and schedule termination (one-shot).
    SendAuthWarning,
}
