//! The /command surface.

/// Parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// /start and /new: pick a project, spawn a session.
    New,
    Sessions,
    Exit,
    History,
    Git,
    Context,
    Download(String),
    UpdateClaude,
    Unknown(String),
}

/// Parse a message text as a command. `None` means ordinary text to route
/// to the active session.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim();
    if !text.starts_with('/') {
        return None;
    }
    let mut parts = text.splitn(2, char::is_whitespace);
    let head = parts.next().unwrap_or_default();
    let rest = parts.next().unwrap_or("").trim();

    // Commands may arrive as /cmd@botname in group chats.
    let name = head
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or_default();

    Some(match name {
        "start" | "new" => Command::New,
        "sessions" => Command::Sessions,
        "exit" => Command::Exit,
        "history" => Command::History,
        "git" => Command::Git,
        "context" => Command::Context,
        "download" => Command::Download(rest.to_string()),
        "update_claude" => Command::UpdateClaude,
        other => Command::Unknown(other.to_string()),
    })
}

pub const HELP_TEXT: &str = "Commands:\n\
/new — pick a project and start a session\n\
/sessions — list sessions, switch or kill\n\
/exit — kill the active session\n\
/history — recent session records\n\
/git — git status of the active project\n\
/context — current screen of the active session\n\
/download &lt;path&gt; — fetch a file from the project\n\
/update_claude — update the agent CLI\n\n\
Anything else is typed into the active session.";
