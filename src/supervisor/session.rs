//! One live agent session: the PTY child plus its pipeline.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::info;
use uuid::Uuid;

use claudegram_core::error::CoreError;
use claudegram_core::messenger::{ChatRef, Messenger};
use claudegram_core::pipeline::{Pipeline, PipelinePhase};
use claudegram_core::stream::EditLimiter;

use crate::bot::client::TelegramMessenger;
use crate::config::{ClaudeConfig, SessionsConfig};
use crate::projects::Project;
use crate::storage::SessionStatus;

use super::pty::PtyProcess;

/// The CLI treats a text+Enter burst as a paste; splitting the carriage
/// return off by this much forces "typed" semantics.
const PASTE_GUARD_DELAY: Duration = Duration::from_millis(150);

/// Grace between SIGTERM and SIGKILL at shutdown.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Why a session is over, as decided by one tick.
#[derive(Debug, Clone, Copy)]
pub struct SessionEnd {
    pub status: SessionStatus,
    pub exit_code: Option<i64>,
}

pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub chat: ChatRef,
    pub project: Project,
    pub pipeline: Pipeline<TelegramMessenger>,
    pty: PtyProcess,
    output: mpsc::UnboundedReceiver<Vec<u8>>,
    last_output: Instant,
    silence_warned: bool,
}

impl Session {
    pub fn spawn(
        api: Arc<TelegramMessenger>,
        limiter: EditLimiter,
        claude: &ClaudeConfig,
        user_id: i64,
        chat: ChatRef,
        project: Project,
    ) -> Result<Self> {
        let (pty, output) = PtyProcess::spawn(&claude.command, &claude.default_args, &project.path)?;
        let id = Uuid::new_v4().to_string();
        info!(session = %id, project = %project.name, "spawned agent session");
        Ok(Session {
            pipeline: Pipeline::new(api, chat, limiter),
            id,
            user_id,
            chat,
            project,
            pty,
            output,
            last_output: Instant::now(),
            silence_warned: false,
        })
    }

    /// Forward a user message as keystrokes: the text, a beat, then Enter.
    pub async fn submit_prompt(&self, text: &str) -> Result<(), CoreError> {
        self.write(text.as_bytes())?;
        tokio::time::sleep(PASTE_GUARD_DELAY).await;
        self.write(b"\r")
    }

    /// Raw keystrokes (approval digits, escape, …).
    pub fn send_keys(&self, bytes: &[u8]) -> Result<(), CoreError> {
        self.write(bytes)
    }

    fn write(&self, bytes: &[u8]) -> Result<(), CoreError> {
        self.pty.write_all(bytes).map_err(|err| CoreError::Pty {
            description: err.to_string(),
        })
    }

    /// One poll tick: drain, feed, classify-and-act, watchdog. Returns the
    /// end verdict once the session should be torn down.
    pub async fn tick(
        &mut self,
        api: &Arc<TelegramMessenger>,
        sessions: &SessionsConfig,
    ) -> Option<SessionEnd> {
        let drained = self.drain_output(sessions.output_max_buffer);
        if !drained.is_empty() {
            self.pipeline.feed(&drained);
            self.last_output = Instant::now();
            self.silence_warned = false;
        }

        if let Some(code) = self.pty.try_exit() {
            let status = if code == 0 {
                SessionStatus::Ended
            } else {
                SessionStatus::Crashed
            };
            return Some(SessionEnd {
                status,
                exit_code: Some(i64::from(code)),
            });
        }

        let outcome = self.pipeline.tick().await;
        if outcome.terminate_session {
            return Some(SessionEnd {
                status: SessionStatus::Ended,
                exit_code: None,
            });
        }

        if self.pipeline.phase() != PipelinePhase::Dormant
            && !self.silence_warned
            && self.last_output.elapsed()
                > Duration::from_secs(sessions.silence_warning_minutes * 60)
        {
            self.silence_warned = true;
            let _ = api
                .send_text(
                    self.chat,
                    &format!(
                        "⚠️ Session <b>{}</b> has produced no output for {} minutes.",
                        claudegram_core::render::escape(&self.project.name),
                        sessions.silence_warning_minutes
                    ),
                )
                .await;
        }

        None
    }

    /// Tear the session down: signal the child, drain what's left, run one
    /// last tick so the pipeline can see the final screen, then flush.
    pub async fn shutdown(&mut self) {
        self.pty.terminate();
        let deadline = Instant::now() + TERM_GRACE;
        while self.pty.try_exit().is_none() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if self.pty.try_exit().is_none() {
            self.pty.kill();
        }

        let drained = self.drain_output(usize::MAX);
        if !drained.is_empty() {
            self.pipeline.feed(&drained);
        }
        self.pipeline.tick().await;
        self.pipeline.final_flush().await;
        crate::files::cleanup_session(&self.id);
    }

    /// Non-blocking bounded drain of buffered PTY output.
    fn drain_output(&mut self, max_bytes: usize) -> Vec<u8> {
        let mut collected = Vec::new();
        while collected.len() < max_bytes {
            match self.output.try_recv() {
                Ok(bytes) => collected.extend(bytes),
                Err(_) => break,
            }
        }
        collected
    }
}
