//! `claudegram` — drive Claude Code from Telegram.
//!
//! Spawns the agent CLI on a PTY per session, watches the TUI it draws,
//! and republishes the meaningful output as live, edit-in-place Telegram
//! messages. Two long-lived tasks on a single-threaded runtime: the
//! update consumer (inbound) and the 300 ms poll loop (outbound).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::Bot;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use claudegram_core::pipeline::validate_table;
use claudegram_core::stream::EditLimiter;

use crate::bot::client::TelegramMessenger;
use crate::bot::updates::{run_update_loop, BotContext};
use crate::cli::Cli;
use crate::config::Config;
use crate::storage::SessionStore;
use crate::supervisor::{run_poll_loop, Supervisor};

mod bot;
mod cli;
mod config;
mod files;
mod gitinfo;
mod projects;
mod storage;
mod supervisor;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;

    init_logging(cli.debug || config.debug);

    // The action table is static; catch a bad refactor before any session
    // can exist.
    validate_table().context("transition table failed validation")?;

    let store = Arc::new(SessionStore::open(&config.database.path)?);
    let lost = store.mark_active_as_lost()?;
    if lost > 0 {
        info!(count = lost, "marked sessions from a previous run as lost");
    }

    let config = Arc::new(config);
    let bot = Bot::new(config.telegram.bot_token.clone());
    let api = Arc::new(TelegramMessenger::new(bot.clone()));
    let limiter = EditLimiter::new(config.rate_limits());
    let supervisor = Arc::new(Mutex::new(Supervisor::new(
        Arc::clone(&api),
        Arc::clone(&config),
        Arc::clone(&store),
        limiter,
    )));

    let cancel = CancellationToken::new();
    let poll = tokio::spawn(run_poll_loop(Arc::clone(&supervisor), cancel.clone()));
    let ctx = BotContext {
        api: Arc::clone(&api),
        supervisor: Arc::clone(&supervisor),
        store,
        config: Arc::clone(&config),
    };
    let updates = tokio::spawn(run_update_loop(bot, ctx, cancel.clone()));

    info!("claudegram running");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    info!("shutdown requested, draining sessions (ctrl-c again to force)");
    cancel.cancel();

    // Poll loop and consumer wind down first, then every child gets
    // SIGTERM → grace → SIGKILL with a final flush. A second ctrl-c
    // abandons the drain; generation guards keep stale edits dead.
    tokio::select! {
        _ = async {
            let _ = poll.await;
            let _ = updates.await;
            supervisor.lock().await.shutdown_all().await;
        } => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("forced shutdown, skipping session drain");
        }
    }
    Ok(())
}

fn init_logging(debug: bool) {
    let default = if debug {
        "claudegram=debug,claudegram_core=debug"
    } else {
        "claudegram=info,claudegram_core=info"
    };
    let filter =
        EnvFilter::try_from_env("CLAUDEGRAM_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
