//! Inbound update consumer: long-polls the Bot API, dispatches commands,
//! callbacks, and plain text.
//!
//! One of the two long-lived tasks (the other is the poll loop). Routing a
//! text message reads the active-session pointer at handling time, so a
//! kill that already promoted another session lands the message there.

use std::sync::Arc;
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, UpdateKind};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use claudegram_core::error::CoreError;
use claudegram_core::messenger::{ChatRef, MessageRef, Messenger};
use claudegram_core::render::{escape, split_for_sending, MESSAGE_LIMIT};

use crate::config::Config;
use crate::storage::SessionStore;
use crate::supervisor::Supervisor;
use crate::{files, gitinfo, projects};

use super::client::TelegramMessenger;
use super::commands::{self, Command, HELP_TEXT};
use super::keyboards;

/// Everything the handlers need, cloned per task.
#[derive(Clone)]
pub struct BotContext {
    pub api: Arc<TelegramMessenger>,
    pub supervisor: Arc<Mutex<Supervisor>>,
    pub store: Arc<SessionStore>,
    pub config: Arc<Config>,
}

/// Long-poll `getUpdates` until cancelled.
pub async fn run_update_loop(bot: Bot, ctx: BotContext, cancel: CancellationToken) {
    let mut offset: i32 = 0;
    info!("update consumer started");
    loop {
        let poll = async { bot.get_updates().offset(offset).timeout(25).await };
        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = poll => match result {
                Ok(updates) => updates,
                Err(err) => {
                    warn!(error = %err, "getUpdates failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(Duration::from_secs(3)) => continue,
                    }
                }
            }
        };

        for update in updates {
            offset = offset.max(update.id.0 as i32 + 1);
            match update.kind {
                UpdateKind::Message(message) => handle_message(&ctx, message).await,
                UpdateKind::CallbackQuery(query) => handle_callback(&ctx, query).await,
                _ => {}
            }
        }
    }
    info!("update consumer stopped");
}

async fn handle_message(ctx: &BotContext, message: Message) {
    let Some(user) = message.from() else {
        return;
    };
    let user_id = user.id.0 as i64;
    let chat = ChatRef(message.chat.id.0);

    if !ctx.config.authorized(user_id) {
        debug!(user = user_id, "ignoring message from unauthorized user");
        return;
    }
    let Some(text) = message.text() else {
        return;
    };

    match commands::parse(text) {
        Some(command) => handle_command(ctx, user_id, chat, command).await,
        None => {
            let result = ctx.supervisor.lock().await.route_text(user_id, text).await;
            if let Err(err) = result {
                let note = match err {
                    CoreError::NoActiveSession => {
                        "No active session — use /new to start one.".to_string()
                    }
                    other => format!("Could not deliver the message: {}", escape(&other.to_string())),
                };
                let _ = ctx.api.send_text(chat, &note).await;
            }
        }
    }
}

async fn handle_command(ctx: &BotContext, user_id: i64, chat: ChatRef, command: Command) {
    match command {
        Command::New => {
            let listing = projects::scan(&ctx.config.projects.root, ctx.config.projects.scan_depth);
            match listing {
                Ok(list) if list.is_empty() => {
                    let _ = ctx
                        .api
                        .send_text(chat, "No projects found under the configured root.")
                        .await;
                }
                Ok(list) => {
                    let _ = ctx
                        .api
                        .send_keyboard(chat, "Pick a project:", &keyboards::project_picker(&list, 0))
                        .await;
                }
                Err(err) => {
                    warn!(error = %err, "project scan failed");
                    let _ = ctx.api.send_text(chat, "Project scan failed.").await;
                }
            }
        }

        Command::Sessions => {
            let overview = ctx.supervisor.lock().await.sessions_overview(user_id);
            if overview.is_empty() {
                let _ = ctx
                    .api
                    .send_text(chat, "No sessions — use /new to start one.")
                    .await;
                return;
            }
            let lines: Vec<String> = overview
                .iter()
                .map(|summary| {
                    let marker = if summary.active { "▶" } else { "·" };
                    format!(
                        "{marker} <b>{}</b> — {:?}",
                        escape(&summary.project),
                        summary.phase
                    )
                })
                .collect();
            let _ = ctx
                .api
                .send_keyboard(chat, &lines.join("\n"), &keyboards::session_list(&overview))
                .await;
        }

        Command::Exit => {
            let result = ctx.supervisor.lock().await.kill_active(user_id).await;
            let note = match result {
                Ok(project) => format!("Killed session <b>{}</b>.", escape(&project)),
                Err(CoreError::NoActiveSession) => "No active session.".to_string(),
                Err(err) => escape(&err.to_string()),
            };
            let _ = ctx.api.send_text(chat, &note).await;
        }

        Command::History => match ctx.store.list_by_user(user_id, 10) {
            Ok(records) if records.is_empty() => {
                let _ = ctx.api.send_text(chat, "No recorded sessions yet.").await;
            }
            Ok(records) => {
                let lines: Vec<String> = records
                    .iter()
                    .map(|record| {
                        format!(
                            "{:<8} {} ({})",
                            record.status.as_str(),
                            record.project,
                            record.started_at
                        )
                    })
                    .collect();
                let body = format!("<pre>{}</pre>", escape(&lines.join("\n")));
                let _ = ctx.api.send_text(chat, &body).await;
            }
            Err(err) => {
                warn!(error = %err, "history query failed");
                let _ = ctx.api.send_text(chat, "History lookup failed.").await;
            }
        },

        Command::Git => {
            let path = ctx.supervisor.lock().await.active_project_path(user_id);
            let note = match path {
                Some(path) => match gitinfo::summarize(&path) {
                    Ok(summary) => format!("<pre>{}</pre>", escape(&summary)),
                    Err(err) => escape(&err.to_string()),
                },
                None => "No active session — use /new to start one.".to_string(),
            };
            let _ = ctx.api.send_text(chat, &note).await;
        }

        Command::Context => {
            let display = ctx.supervisor.lock().await.active_display(user_id);
            match display {
                Some(rows) => {
                    let screen = rows.join("\n");
                    let body = format!("<pre>{}</pre>", escape(screen.trim_end()));
                    for part in split_for_sending(&body, MESSAGE_LIMIT) {
                        let _ = ctx.api.send_text(chat, &part).await;
                    }
                }
                None => {
                    let _ = ctx
                        .api
                        .send_text(chat, "No active session — use /new to start one.")
                        .await;
                }
            }
        }

        Command::Download(path) => {
            if path.is_empty() {
                let _ = ctx
                    .api
                    .send_text(chat, "Usage: /download &lt;path inside the project&gt;")
                    .await;
                return;
            }
            let project = ctx.supervisor.lock().await.active_project_path(user_id);
            let Some(project) = project else {
                let _ = ctx
                    .api
                    .send_text(chat, "No active session — use /new to start one.")
                    .await;
                return;
            };
            match files::resolve_download(&project, &path) {
                Ok(resolved) => {
                    if let Err(err) = ctx
                        .api
                        .send_document(chat, &resolved, Some(&path))
                        .await
                    {
                        let _ = ctx
                            .api
                            .send_text(chat, &format!("Upload failed: {}", escape(&err.to_string())))
                            .await;
                    }
                }
                Err(err) => {
                    let _ = ctx.api.send_text(chat, &escape(&err.to_string())).await;
                }
            }
        }

        Command::UpdateClaude => {
            let _ = ctx
                .api
                .send_keyboard(
                    chat,
                    &format!(
                        "Run <code>{}</code>?",
                        escape(&ctx.config.claude.update_command)
                    ),
                    &keyboards::update_confirm(),
                )
                .await;
        }

        Command::Unknown(_) => {
            let _ = ctx.api.send_text(chat, HELP_TEXT).await;
        }
    }
}

async fn handle_callback(ctx: &BotContext, query: CallbackQuery) {
    let user_id = query.from.id.0 as i64;
    // This is a private-chat bot: the chat id is the user id.
    let chat = ChatRef(user_id);
    // The message carrying the tapped keyboard, for picker cleanup.
    let origin = query
        .message
        .as_ref()
        .map(|message| MessageRef(message.id().0));

    if !ctx.config.authorized(user_id) {
        let _ = ctx.api.answer_callback(&query.id, Some("Not authorized")).await;
        return;
    }
    let Some(data) = query.data else {
        let _ = ctx.api.answer_callback(&query.id, None).await;
        return;
    };

    if let Some(option) = data.strip_prefix(claudegram_core::pipeline::TOOL_CALLBACK_PREFIX) {
        let option: u8 = option.parse().unwrap_or(0);
        let result = ctx
            .supervisor
            .lock()
            .await
            .handle_tool_approval(user_id, option);
        match result {
            Ok(Some(keyboard_message)) => {
                let toast = if option == 3 { "Declined" } else { "Approved" };
                let _ = ctx.api.answer_callback(&query.id, Some(toast)).await;
                let _ = ctx.api.remove_keyboard(chat, keyboard_message).await;
            }
            Ok(None) => {
                let _ = ctx
                    .api
                    .answer_callback(&query.id, Some("Nothing pending"))
                    .await;
            }
            Err(err) => {
                let _ = ctx
                    .api
                    .answer_callback(&query.id, Some(&err.to_string()))
                    .await;
            }
        }
        return;
    }

    if let Some(name) = data.strip_prefix(keyboards::PROJECT_PREFIX) {
        let _ = ctx.api.answer_callback(&query.id, None).await;
        // The picker served its purpose.
        if let Some(origin) = origin {
            let _ = ctx.api.delete_message(chat, origin).await;
        }
        let project =
            projects::find(&ctx.config.projects.root, ctx.config.projects.scan_depth, name);
        let Ok(Some(project)) = project else {
            let _ = ctx.api.send_text(chat, "That project no longer exists.").await;
            return;
        };
        let result = ctx
            .supervisor
            .lock()
            .await
            .create_session(user_id, chat, project);
        let note = match result {
            Ok(_) => format!(
                "Started a session in <b>{}</b> — just type to talk to Claude.",
                escape(name)
            ),
            Err(err) => escape(&err.to_string()),
        };
        let _ = ctx.api.send_text(chat, &note).await;
        return;
    }

    if let Some(id) = data.strip_prefix(keyboards::SWITCH_PREFIX) {
        let result = ctx.supervisor.lock().await.switch_active(user_id, id);
        let toast = match result {
            Ok(project) => format!("Active: {project}"),
            Err(err) => err.to_string(),
        };
        let _ = ctx.api.answer_callback(&query.id, Some(&toast)).await;
        return;
    }

    if let Some(id) = data.strip_prefix(keyboards::KILL_PREFIX) {
        let _ = ctx.api.answer_callback(&query.id, None).await;
        let result = ctx.supervisor.lock().await.kill_session(user_id, id).await;
        let note = match result {
            Ok(project) => format!("Killed session <b>{}</b>.", escape(&project)),
            Err(err) => escape(&err.to_string()),
        };
        let _ = ctx.api.send_text(chat, &note).await;
        return;
    }

    if let Some(page) = data.strip_prefix(keyboards::PAGE_PREFIX) {
        let _ = ctx.api.answer_callback(&query.id, None).await;
        if let Some(origin) = origin {
            let _ = ctx.api.delete_message(chat, origin).await;
        }
        let page: usize = page.parse().unwrap_or(0);
        if let Ok(list) =
            projects::scan(&ctx.config.projects.root, ctx.config.projects.scan_depth)
        {
            let _ = ctx
                .api
                .send_keyboard(chat, "Pick a project:", &keyboards::project_picker(&list, page))
                .await;
        }
        return;
    }

    if data.strip_prefix(keyboards::UPDATE_PREFIX) == Some("run") {
        let _ = ctx.api.answer_callback(&query.id, Some("Updating…")).await;
        run_claude_update(ctx, chat).await;
        return;
    }

    let _ = ctx.api.answer_callback(&query.id, None).await;
}

/// Run the configured update command and report its output.
async fn run_claude_update(ctx: &BotContext, chat: ChatRef) {
    let parts = match shell_words::split(&ctx.config.claude.update_command) {
        Ok(parts) if !parts.is_empty() => parts,
        _ => {
            let _ = ctx.api.send_text(chat, "Bad update command in config.").await;
            return;
        }
    };
    let result = tokio::time::timeout(
        Duration::from_secs(300),
        tokio::process::Command::new(&parts[0])
            .args(&parts[1..])
            .output(),
    )
    .await;

    let note = match result {
        Ok(Ok(output)) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            let combined = format!("{stdout}\n{stderr}");
            let tail: String = combined
                .trim()
                .chars()
                .rev()
                .take(1500)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!(
                "Update finished (exit {}):\n<pre>{}</pre>",
                output.status.code().unwrap_or(-1),
                escape(&tail)
            )
        }
        Ok(Err(err)) => format!("Update failed to start: {}", escape(&err.to_string())),
        Err(_) => "Update timed out after 5 minutes.".to_string(),
    };
    let _ = ctx.api.send_text(chat, &note).await;
}
