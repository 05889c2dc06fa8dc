//! The session supervisor: per-user bounded session registry, routing, and
//! the tick fan-out.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use claudegram_core::error::CoreError;
use claudegram_core::messenger::{ChatRef, MessageRef, Messenger};
use claudegram_core::pipeline::PipelinePhase;
use claudegram_core::render::escape;
use claudegram_core::stream::EditLimiter;

use crate::bot::client::TelegramMessenger;
use crate::config::Config;
use crate::projects::Project;
use crate::storage::{SessionStatus, SessionStore};

use super::session::{Session, SessionEnd};

/// Listing row for /sessions.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub id: String,
    pub project: String,
    pub active: bool,
    pub phase: PipelinePhase,
}

#[derive(Default)]
struct UserSessions {
    sessions: Vec<Session>,
    /// Exactly one session per user receives routed text.
    active: Option<String>,
}

pub struct Supervisor {
    api: Arc<TelegramMessenger>,
    config: Arc<Config>,
    store: Arc<SessionStore>,
    limiter: EditLimiter,
    users: HashMap<i64, UserSessions>,
}

impl Supervisor {
    pub fn new(
        api: Arc<TelegramMessenger>,
        config: Arc<Config>,
        store: Arc<SessionStore>,
        limiter: EditLimiter,
    ) -> Self {
        Supervisor {
            api,
            config,
            store,
            limiter,
            users: HashMap::new(),
        }
    }

    /// Spawn a session for the user, enforcing the per-user cap. The new
    /// session becomes active.
    pub fn create_session(
        &mut self,
        user_id: i64,
        chat: ChatRef,
        project: Project,
    ) -> Result<String, CoreError> {
        let max = self.config.sessions.max_per_user;
        let state = self.users.entry(user_id).or_default();
        if state.sessions.len() >= max {
            return Err(CoreError::SessionLimitReached { max_sessions: max });
        }

        let session = Session::spawn(
            Arc::clone(&self.api),
            self.limiter.clone(),
            &self.config.claude,
            user_id,
            chat,
            project,
        )
        .map_err(|err| CoreError::Pty {
            description: err.to_string(),
        })?;

        let id = session.id.clone();
        if let Err(err) = self.store.create(
            &id,
            user_id,
            &session.project.name,
            &session.project.path.to_string_lossy(),
        ) {
            error!(error = %err, "failed to record session");
        }
        state.active = Some(id.clone());
        state.sessions.push(session);
        Ok(id)
    }

    /// Route a plain text message to the user's active session.
    pub async fn route_text(&mut self, user_id: i64, text: &str) -> Result<(), CoreError> {
        let session = self.active_session(user_id)?;
        session.submit_prompt(text).await
    }

    /// The user tapped an approval button. Sends the keystroke for the
    /// chosen option and returns the keyboard message (for button removal)
    /// if the request was still pending.
    pub fn handle_tool_approval(
        &mut self,
        user_id: i64,
        option: u8,
    ) -> Result<Option<MessageRef>, CoreError> {
        let session = self.active_session(user_id)?;
        if !session.pipeline.tool_request_pending() {
            return Ok(None);
        }
        // Option 1 is pre-selected (`❯ 1.`), so Enter confirms it; the
        // other options respond to their digit directly.
        let keys: &[u8] = match option {
            1 => b"\r",
            2 => b"2",
            3 => b"3",
            _ => return Ok(None),
        };
        session.send_keys(keys)?;
        Ok(session.pipeline.resolve_tool_request())
    }

    /// Kill the user's active session.
    pub async fn kill_active(&mut self, user_id: i64) -> Result<String, CoreError> {
        let active = self
            .users
            .get(&user_id)
            .and_then(|state| state.active.clone())
            .ok_or(CoreError::NoActiveSession)?;
        self.kill_session(user_id, &active).await
    }

    /// Kill a specific session; returns its project name.
    pub async fn kill_session(&mut self, user_id: i64, id: &str) -> Result<String, CoreError> {
        let mut session = self.take_session(user_id, id)?;
        session.shutdown().await;
        let project = session.project.name.clone();
        if let Err(err) = self
            .store
            .end_with_status(id, SessionStatus::Ended, None)
        {
            error!(error = %err, "failed to record session end");
        }
        info!(session = %id, project = %project, "session killed");
        Ok(project)
    }

    /// Make another session the routing target.
    pub fn switch_active(&mut self, user_id: i64, id: &str) -> Result<String, CoreError> {
        let state = self
            .users
            .get_mut(&user_id)
            .ok_or(CoreError::NoActiveSession)?;
        let session = state
            .sessions
            .iter()
            .find(|session| session.id == id)
            .ok_or_else(|| CoreError::SessionNotFound {
                session_id: id.to_string(),
            })?;
        let project = session.project.name.clone();
        state.active = Some(id.to_string());
        Ok(project)
    }

    pub fn sessions_overview(&self, user_id: i64) -> Vec<SessionSummary> {
        let Some(state) = self.users.get(&user_id) else {
            return Vec::new();
        };
        state
            .sessions
            .iter()
            .map(|session| SessionSummary {
                id: session.id.clone(),
                project: session.project.name.clone(),
                active: state.active.as_deref() == Some(session.id.as_str()),
                phase: session.pipeline.phase(),
            })
            .collect()
    }

    /// Current screen of the active session, for /context.
    pub fn active_display(&self, user_id: i64) -> Option<Vec<String>> {
        let state = self.users.get(&user_id)?;
        let active = state.active.as_deref()?;
        state
            .sessions
            .iter()
            .find(|session| session.id == active)
            .map(|session| session.pipeline.display())
    }

    /// Project directory of the active session, for /git and /download.
    pub fn active_project_path(&self, user_id: i64) -> Option<PathBuf> {
        let state = self.users.get(&user_id)?;
        let active = state.active.as_deref()?;
        state
            .sessions
            .iter()
            .find(|session| session.id == active)
            .map(|session| session.project.path.clone())
    }

    /// One shared clock tick across every live session.
    pub async fn tick_all(&mut self) {
        let api = Arc::clone(&self.api);
        let sessions_cfg = self.config.sessions.clone();

        let mut ended: Vec<(i64, String, SessionEnd)> = Vec::new();
        for (user_id, state) in self.users.iter_mut() {
            for session in state.sessions.iter_mut() {
                if let Some(end) = session.tick(&api, &sessions_cfg).await {
                    ended.push((*user_id, session.id.clone(), end));
                }
            }
        }

        for (user_id, id, end) in ended {
            self.finish_session(user_id, &id, end).await;
        }
    }

    /// Terminate everything; used at shutdown.
    pub async fn shutdown_all(&mut self) {
        let users: Vec<i64> = self.users.keys().copied().collect();
        for user_id in users {
            let Some(state) = self.users.get_mut(&user_id) else {
                continue;
            };
            let mut sessions = std::mem::take(&mut state.sessions);
            state.active = None;
            for session in sessions.iter_mut() {
                session.shutdown().await;
                if let Err(err) =
                    self.store
                        .end_with_status(&session.id, SessionStatus::Ended, None)
                {
                    error!(error = %err, "failed to record session end");
                }
            }
        }
    }

    /// A tick decided this session is over: tear it down, record it, tell
    /// the user, promote the next session.
    async fn finish_session(&mut self, user_id: i64, id: &str, end: SessionEnd) {
        let Ok(mut session) = self.take_session(user_id, id) else {
            return;
        };
        let chat = session.chat;
        let project = session.project.name.clone();
        session.shutdown().await;

        if let Err(err) = self.store.end_with_status(id, end.status, end.exit_code) {
            error!(error = %err, "failed to record session end");
        }

        let note = match end.status {
            SessionStatus::Crashed => format!(
                "💥 Session <b>{}</b> crashed (exit code {}). Use /new to start another.",
                escape(&project),
                end.exit_code.unwrap_or(-1)
            ),
            _ => format!("Session <b>{}</b> ended.", escape(&project)),
        };
        if let Err(err) = self.api.send_text(chat, &note).await {
            warn!(error = %err, "failed to notify session end");
        }
        info!(
            session = %id,
            user = session.user_id,
            project = %project,
            status = end.status.as_str(),
            "session finished"
        );
    }

    /// Remove a session from its user's registry, promoting the next one
    /// to active when the removed session held the pointer.
    fn take_session(&mut self, user_id: i64, id: &str) -> Result<Session, CoreError> {
        let state = self
            .users
            .get_mut(&user_id)
            .ok_or(CoreError::NoActiveSession)?;
        let idx = state
            .sessions
            .iter()
            .position(|session| session.id == id)
            .ok_or_else(|| CoreError::SessionNotFound {
                session_id: id.to_string(),
            })?;
        let session = state.sessions.remove(idx);
        if state.active.as_deref() == Some(id) {
            state.active = state.sessions.first().map(|next| next.id.clone());
        }
        Ok(session)
    }

    fn active_session(&mut self, user_id: i64) -> Result<&mut Session, CoreError> {
        let state = self
            .users
            .get_mut(&user_id)
            .ok_or(CoreError::NoActiveSession)?;
        let active = state.active.clone().ok_or(CoreError::NoActiveSession)?;
        state
            .sessions
            .iter_mut()
            .find(|session| session.id == active)
            .ok_or(CoreError::NoActiveSession)
    }
}
