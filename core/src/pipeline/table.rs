//! The static transition table: `(phase, observation) → (next phase, actions)`.
//!
//! Every pair not listed explicitly stays in phase with no actions, which
//! makes the table total by construction; `validate_table` re-checks the
//! essential rows at startup so a refactor that drops one is caught before
//! any session exists.

use crate::error::CoreError;
use crate::screen::TerminalView;

use super::action::Action;
use super::phase::PipelinePhase;

/// One resolved table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: PipelinePhase,
    pub actions: &'static [Action],
}

use Action::*;
use PipelinePhase::*;
use TerminalView as View;

/// Look up the transition for one observation. Total over the full
/// `PipelinePhase` × `TerminalView` product.
pub fn transition(phase: PipelinePhase, view: TerminalView) -> Transition {
    let (next, actions): (PipelinePhase, &'static [Action]) = match (phase, view) {
        // ─── Dormant: waiting for the agent to do something ───
        (Dormant, View::Thinking) => (Thinking, &[SendThinking]),
        (Dormant, View::Streaming) => (Streaming, &[ExtractAndSend]),
        (Dormant, View::ToolRequest) => (ToolPending, &[SendKeyboard]),
        (Dormant, View::AuthRequired) => (Dormant, &[SendAuthWarning]),

        // ─── Thinking: placeholder shown ───
        (Thinking, View::Streaming) => (Streaming, &[ExtractAndSend]),
        (Thinking, View::Idle) => (Dormant, &[ExtractAndSend, Finalize]),
        (Thinking, View::ToolRequest) => (ToolPending, &[Finalize, SendKeyboard]),
        (Thinking, View::AuthRequired) => (Dormant, &[SendAuthWarning]),

        // ─── Streaming: live message is being edited ───
        (Streaming, View::Streaming) => (Streaming, &[ExtractAndSend]),
        (Streaming, View::ToolRunning) => (Streaming, &[ExtractAndSend]),
        (Streaming, View::ToolResult) => (Streaming, &[ExtractAndSend]),
        (Streaming, View::TodoList) => (Streaming, &[ExtractAndSend]),
        (Streaming, View::ParallelAgents) => (Streaming, &[ExtractAndSend]),
        (Streaming, View::BackgroundTask) => (Streaming, &[ExtractAndSend]),
        (Streaming, View::Thinking) => (Thinking, &[Finalize, SendThinking]),
        (Streaming, View::ToolRequest) => (ToolPending, &[Finalize, SendKeyboard]),
        (Streaming, View::Idle) => (Dormant, &[Finalize]),
        (Streaming, View::Error) => (Dormant, &[ExtractAndSend, Finalize]),
        (Streaming, View::AuthRequired) => (Dormant, &[SendAuthWarning]),

        // ─── ToolPending: keyboard out, user decides ───
        // The approval itself arrives out-of-band (callback handler writes
        // to the PTY), so seeing the tool start needs no action here.
        (ToolPending, View::ToolRunning) => (Streaming, &[]),
        (ToolPending, View::Streaming) => (Streaming, &[ExtractAndSend]),
        (ToolPending, View::Idle) => (Dormant, &[Finalize]),
        // Re-observing the same menu: the one-shot guard makes the
        // keyboard-send a no-op.
        (ToolPending, View::ToolRequest) => (ToolPending, &[SendKeyboard]),
        (ToolPending, View::AuthRequired) => (Dormant, &[SendAuthWarning]),

        // Everything else: stay put, do nothing.
        (current, _) => (current, &[]),
    };
    Transition { next, actions }
}

/// Startup totality check: every `(phase, view)` pair must resolve, and the
/// rows that define the essential behavior must be present. Fatal before
/// any session starts.
pub fn validate_table() -> Result<(), CoreError> {
    for phase in PipelinePhase::ALL {
        for view in TerminalView::ALL {
            // Resolving is the check: the match is total, but a panic here
            // (from a future partial refactor) must happen now, not
            // mid-session.
            let _ = transition(phase, view);
        }
    }

    let essentials: [(PipelinePhase, TerminalView, PipelinePhase); 6] = [
        (Dormant, View::Thinking, Thinking),
        (Thinking, View::Streaming, Streaming),
        (Streaming, View::ToolRequest, ToolPending),
        (ToolPending, View::ToolRunning, Streaming),
        (Streaming, View::Idle, Dormant),
        (ToolPending, View::Idle, Dormant),
    ];
    for (phase, view, expected) in essentials {
        let row = transition(phase, view);
        if row.next != expected {
            return Err(CoreError::TransitionTable {
                detail: format!("({phase:?}, {view:?}) resolves to {:?}, expected {expected:?}", row.next),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_total() {
        assert!(validate_table().is_ok());
    }

    #[test]
    fn test_essential_rows() {
        let row = transition(Dormant, View::Thinking);
        assert_eq!(row.next, Thinking);
        assert_eq!(row.actions, &[SendThinking]);

        let row = transition(Thinking, View::Idle);
        assert_eq!(row.next, Dormant);
        assert_eq!(row.actions, &[ExtractAndSend, Finalize]);

        let row = transition(Streaming, View::ToolRequest);
        assert_eq!(row.next, ToolPending);
        assert_eq!(row.actions, &[Finalize, SendKeyboard]);

        let row = transition(ToolPending, View::ToolRunning);
        assert_eq!(row.next, Streaming);
        assert!(row.actions.is_empty());
    }

    #[test]
    fn test_unlisted_pairs_stay_in_phase() {
        let row = transition(Dormant, View::TodoList);
        assert_eq!(row.next, Dormant);
        assert!(row.actions.is_empty());

        let row = transition(Thinking, View::Thinking);
        assert_eq!(row.next, Thinking);
        assert!(row.actions.is_empty());

        // Only Streaming has an Error row; from Thinking it is a no-op.
        let row = transition(Thinking, View::Error);
        assert_eq!(row.next, Thinking);
        assert!(row.actions.is_empty());

        let row = transition(Dormant, View::Unknown);
        assert_eq!(row.next, Dormant);
        assert!(row.actions.is_empty());
    }

    #[test]
    fn test_auth_required_reachable_from_every_phase() {
        for phase in PipelinePhase::ALL {
            let row = transition(phase, View::AuthRequired);
            assert_eq!(row.actions, &[SendAuthWarning], "phase {phase:?}");
        }
    }
}
