//! The per-session pipeline: owns the emulator and the live message, turns
//! one observation per tick into actions.
//!
//! Actions run in table order, each inside a catch-all: a failed action is
//! logged and the rest proceed, and the phase advance happens
//! unconditionally afterwards. That keeps the session making forward
//! progress through transient messenger failures.

use std::sync::Arc;

use tracing::{trace, warn};

use crate::error::CoreError;
use crate::messenger::{Button, ChatRef, MessageRef, Messenger};
use crate::render::{escape, extract_delta, extract_full, render_to_html};
use crate::screen::{classify, ScreenEvent, TerminalView, ViewPayload};
use crate::stream::{EditLimiter, StreamingController};
use crate::term::TerminalEmulator;

use super::action::Action;
use super::phase::PipelinePhase;
use super::table::transition;

const THINKING_PLACEHOLDER: &str = "Thinking…";
const AUTH_WARNING: &str = "⚠️ Claude Code is asking for authentication. \
Log in on the host machine (<code>claude login</code>), then start a fresh \
session with /new. This session will now be closed.";

/// Callback-data prefix for approval buttons; the option number follows.
pub const TOOL_CALLBACK_PREFIX: &str = "tool:";

/// What one tick decided beyond its side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub view: TerminalView,
    /// Set by the auth warning: the supervisor must terminate the session.
    pub terminate_session: bool,
}

/// Per-session pipeline state: phase, emulator, live message and the two
/// one-shot guards.
pub struct Pipeline<M: Messenger> {
    api: Arc<M>,
    chat: ChatRef,
    emulator: TerminalEmulator,
    stream: StreamingController<M>,
    phase: PipelinePhase,
    /// Set when a keyboard went out; cleared when the user acts on it.
    tool_request_pending: bool,
    /// The keyboard message, for stripping its buttons after the answer.
    keyboard_message: Option<MessageRef>,
    auth_warning_sent: bool,
    /// Once the session has left the startup screen, later `Startup`
    /// classifications are the pinned banner and downgrade to `Unknown`.
    left_startup: bool,
}

impl<M: Messenger> Pipeline<M> {
    pub fn new(api: Arc<M>, chat: ChatRef, limiter: EditLimiter) -> Self {
        Pipeline {
            stream: StreamingController::new(Arc::clone(&api), chat, limiter),
            api,
            chat,
            emulator: TerminalEmulator::new(),
            phase: PipelinePhase::Dormant,
            tool_request_pending: false,
            keyboard_message: None,
            auth_warning_sent: false,
            left_startup: false,
        }
    }

    /// Feed freshly drained PTY bytes into the grid.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.emulator.feed(bytes);
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Current plain-text screen, for the /context command.
    pub fn display(&self) -> Vec<String> {
        self.emulator.get_full_display()
    }

    /// Whether a keyboard is out and unanswered.
    pub fn tool_request_pending(&self) -> bool {
        self.tool_request_pending
    }

    /// The user acted on the approval keyboard: clear the one-shot guard
    /// and hand back the keyboard message for button removal.
    pub fn resolve_tool_request(&mut self) -> Option<MessageRef> {
        self.tool_request_pending = false;
        self.keyboard_message.take()
    }

    /// One poll tick: classify the screen, run the transition's actions,
    /// advance the phase, pump any deferred edits.
    pub async fn tick(&mut self) -> TickOutcome {
        let display = self.emulator.get_full_display();
        let mut event = classify(&display);

        match event.view {
            TerminalView::Startup if self.left_startup => {
                event = ScreenEvent::bare(TerminalView::Unknown);
            }
            TerminalView::Startup | TerminalView::Unknown => {}
            _ => self.left_startup = true,
        }

        if event.view == TerminalView::Unknown {
            trace!("unclassified screen");
        }

        let row = transition(self.phase, event.view);
        let mut outcome = TickOutcome {
            view: event.view,
            terminate_session: false,
        };

        for action in row.actions {
            if let Err(err) = self.run_action(*action, &event, &mut outcome).await {
                warn!(action = ?action, error = %err, "pipeline action failed");
            }
        }
        self.phase = row.next;

        self.stream.pump().await;
        outcome
    }

    /// Last-gasp flush for session termination: re-render the full screen
    /// and seal the live message, skipping the debounce.
    pub async fn final_flush(&mut self) {
        let attributed = self.emulator.get_full_attributed_lines();
        let html = render_to_html(extract_full(&attributed));
        self.stream.finalize_now(&html).await;
    }

    async fn run_action(
        &mut self,
        action: Action,
        event: &ScreenEvent,
        outcome: &mut TickOutcome,
    ) -> Result<(), CoreError> {
        match action {
            Action::SendThinking => {
                self.api.typing(self.chat).await?;
                self.stream.open_placeholder(THINKING_PLACEHOLDER).await;
            }
            Action::ExtractAndSend => {
                let changes = self.emulator.get_attributed_changes();
                if changes.is_empty() {
                    return Ok(());
                }
                let html = render_to_html(extract_delta(&changes));
                if !html.is_empty() {
                    self.stream.append(&html).await;
                }
            }
            Action::Finalize => {
                let attributed = self.emulator.get_full_attributed_lines();
                let html = render_to_html(extract_full(&attributed));
                self.stream.replace_and_finalize(&html).await;
            }
            Action::SendKeyboard => {
                // One keyboard per Streaming → ToolPending edge; a repeat
                // observation of the same menu is a no-op.
                if self.tool_request_pending {
                    return Ok(());
                }
                let ViewPayload::ToolRequest(info) = &event.payload else {
                    return Ok(());
                };
                let question = info
                    .question
                    .as_deref()
                    .unwrap_or("Approve this tool action?");
                let buttons: Vec<Button> = info
                    .options
                    .iter()
                    .enumerate()
                    .map(|(idx, option)| {
                        Button::new(option.clone(), format!("{TOOL_CALLBACK_PREFIX}{}", idx + 1))
                    })
                    .collect();
                let message = self
                    .api
                    .send_keyboard(self.chat, &escape(question), &buttons)
                    .await?;
                self.keyboard_message = Some(message);
                self.tool_request_pending = true;
            }
            Action::SendAuthWarning => {
                // Once per session, ever.
                if self.auth_warning_sent {
                    return Ok(());
                }
                self.api.send_text(self.chat, AUTH_WARNING).await?;
                self.auth_warning_sent = true;
                outcome.terminate_session = true;
            }
        }
        Ok(())
    }
}
