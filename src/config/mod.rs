//! Configuration management.
//!
//! YAML configuration with serde defaults; every missing-required-field and
//! invalid-value case is a fatal startup error surfaced by `validate`, so a
//! session can never start against a half-formed configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};

use claudegram_core::stream::RateLimitConfig;

/// Default configuration file name
const CONFIG_FILE_NAME: &str = "claudegram.yaml";

/// Default config directory name
const CONFIG_DIR_NAME: &str = "claudegram";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,

    pub projects: ProjectsConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub claude: ClaudeConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub edit_rate: EditRateConfig,

    /// Verbose logging
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Bot API token from @BotFather
    pub bot_token: String,
    /// Telegram user ids allowed to talk to the bridge
    pub authorized_users: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProjectsConfig {
    /// Directory whose subdirectories are offered as projects
    pub root: PathBuf,
    /// How many directory levels below the root to scan
    #[serde(default = "default_scan_depth")]
    pub scan_depth: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionsConfig {
    /// Concurrent sessions allowed per user
    #[serde(default = "default_max_per_user")]
    pub max_per_user: usize,
    /// Debounce for coalescing output edits
    #[serde(default = "default_output_debounce_ms")]
    pub output_debounce_ms: u64,
    /// Per-tick cap on drained PTY bytes
    #[serde(default = "default_output_max_buffer")]
    pub output_max_buffer: usize,
    /// Warn once when a busy session goes quiet for this long
    #[serde(default = "default_silence_warning_minutes")]
    pub silence_warning_minutes: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaudeConfig {
    /// The agent CLI executable
    #[serde(default = "default_claude_command")]
    pub command: String,
    /// Extra arguments passed on every spawn
    #[serde(default)]
    pub default_args: Vec<String>,
    /// Shell command run by /update_claude
    #[serde(default = "default_update_command")]
    pub update_command: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// SQLite file holding session records
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EditRateConfig {
    /// Minimum seconds between edits of one message
    #[serde(default = "default_per_message_seconds")]
    pub per_message_seconds: f64,
    /// Cap on outbound send/edit calls per minute, all chats combined
    #[serde(default = "default_global_per_minute")]
    pub global_per_minute: u32,
}

fn default_scan_depth() -> usize {
    1
}

fn default_max_per_user() -> usize {
    3
}

fn default_output_debounce_ms() -> u64 {
    500
}

fn default_output_max_buffer() -> usize {
    2000
}

fn default_silence_warning_minutes() -> u64 {
    10
}

fn default_claude_command() -> String {
    "claude".to_string()
}

fn default_update_command() -> String {
    "claude update".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/sessions.db")
}

fn default_per_message_seconds() -> f64 {
    1.0
}

fn default_global_per_minute() -> u32 {
    25
}

impl Default for SessionsConfig {
    fn default() -> Self {
        SessionsConfig {
            max_per_user: default_max_per_user(),
            output_debounce_ms: default_output_debounce_ms(),
            output_max_buffer: default_output_max_buffer(),
            silence_warning_minutes: default_silence_warning_minutes(),
        }
    }
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        ClaudeConfig {
            command: default_claude_command(),
            default_args: Vec::new(),
            update_command: default_update_command(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: default_database_path(),
        }
    }
}

impl Default for EditRateConfig {
    fn default() -> Self {
        EditRateConfig {
            per_message_seconds: default_per_message_seconds(),
            global_per_minute: default_global_per_minute(),
        }
    }
}

impl Config {
    /// Load from an explicit path, or the first of ./claudegram.yaml and
    /// the user config directory.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::default_path()?,
        };
        let config = Self::load_from_file(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn default_path() -> Result<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(local);
        }
        if let Some(mut dir) = config_dir() {
            dir.push(CONFIG_DIR_NAME);
            dir.push(CONFIG_FILE_NAME);
            if dir.exists() {
                return Ok(dir);
            }
        }
        bail!(
            "no configuration found: create ./{CONFIG_FILE_NAME} or \
             $XDG_CONFIG_HOME/{CONFIG_DIR_NAME}/{CONFIG_FILE_NAME}"
        )
    }

    /// Fatal-at-startup validation of required fields and value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            bail!("telegram.bot_token is required");
        }
        if self.telegram.authorized_users.is_empty() {
            bail!("telegram.authorized_users must list at least one user id");
        }
        if !self.projects.root.is_dir() {
            bail!(
                "projects.root is not an existing directory: {}",
                self.projects.root.display()
            );
        }
        if self.projects.scan_depth < 1 {
            bail!("projects.scan_depth must be >= 1");
        }
        if self.sessions.max_per_user < 1 {
            bail!("sessions.max_per_user must be >= 1");
        }
        if self.edit_rate.per_message_seconds <= 0.0 {
            bail!("edit_rate.per_message_seconds must be positive");
        }
        Ok(())
    }

    pub fn authorized(&self, user_id: i64) -> bool {
        self.telegram.authorized_users.contains(&user_id)
    }

    pub fn rate_limits(&self) -> RateLimitConfig {
        RateLimitConfig {
            per_message_interval: Duration::from_secs_f64(self.edit_rate.per_message_seconds),
            global_per_minute: self.edit_rate.global_per_minute,
            stream_debounce: Duration::from_millis(self.sessions.output_debounce_ms),
        }
    }
}
