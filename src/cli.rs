//! Command-line interface definition.

use std::path::PathBuf;

use clap::Parser;

/// Telegram bridge for Claude Code sessions
#[derive(Parser, Debug)]
#[command(name = "claudegram", version, about)]
pub struct Cli {
    /// Path to the configuration file (default: ./claudegram.yaml, then
    /// the user config directory)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Force debug-level logging regardless of configuration
    #[arg(long)]
    pub debug: bool,
}
