//! Three-pass priority detection over a full display.
//!
//! Each pass runs its detectors in order and the first match wins, so the
//! pass ordering *is* the priority encoding. Pass 1 looks at the whole
//! screen for the high-signal panels (tool approval, auth, todos, agent
//! tree). Pass 2 scans only the bottom of the screen, where the status line
//! idioms live. Pass 3 handles the prompt/streaming/startup fallbacks.

use std::sync::LazyLock;

use regex::Regex;

use super::view::{
    AgentInfo, ScreenEvent, TerminalView, TodoInfo, TodoState, ToolRequestInfo, ViewPayload,
};

/// How many bottom rows pass 2 inspects. Captures show the agent only draws
/// its transient status idioms there; widen this if a capture ever proves
/// otherwise.
const BOTTOM_SCAN_ROWS: usize = 8;

static SELECTED_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*❯\s*1\.\s+\S").unwrap());
static NUMBERED_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:❯\s*)?([123])\.\s+(.+?)\s*$").unwrap());
static ESC_HINT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)esc\b.*cancel").unwrap());
static TODO_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+tasks?\s+\((\d+)\s+done[^)]*\).*ctrl\+t to hide tasks").unwrap()
});
static TODO_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([◻◼✔])\s+(.+?)\s*$").unwrap());
static AGENTS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+agents?\s+launched\s+\(ctrl\+o to expand\)").unwrap()
});
static AGENT_TREE_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s│]*[├└]─+\s*(.+?)\s*$").unwrap());
static THINKING_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[✶✳✻✽✢·]\s+\S.*…").unwrap());
static TOOL_RUNNING_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"⎿\s+(Running(\s+PreToolUse hooks)?…|Waiting…)").unwrap()
});
static TOOL_RESULT_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"⎿\s+Added\s+\d+\s+lines?,\s+removed\s+\d+\s+lines?").unwrap()
});
static BACKGROUND_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"in the background").unwrap());
static BACKGROUND_HINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(ctrl-b|/bashes|to manage)").unwrap());
static PROMPT_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*│?\s*❯\s*(.*?)\s*│?\s*$").unwrap());
static SEPARATOR_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[╭╰]?[─━]{3,}[╮╯]?\s*\u{fffd}?\s*$").unwrap());

/// Keywords that mean the CLI is asking the *operator* to authenticate, not
/// the conversation to continue.
const AUTH_KEYWORDS: &[&str] = &[
    "Select login method",
    "claude.ai/login",
    "Invalid API key",
    "run /login",
    "Please log in",
    "OAuth error",
    "Authentication required",
];

const ERROR_KEYWORDS: &[&str] = &[
    "MCP server",
    "ENOENT",
    "command not found",
    "No such file or directory",
    "panicked at",
    "Error:",
];

const LOGO_GLYPHS: &[char] = &['▐', '▛', '▜', '▌'];

/// Classify one full display snapshot into exactly one observation.
pub fn classify(display: &[String]) -> ScreenEvent {
    if let Some(event) = pass1(display) {
        return event;
    }
    if let Some(event) = pass2(display) {
        return event;
    }
    pass3(display)
}

// =============================================================================
// Pass 1: screen-wide panels
// =============================================================================

fn pass1(display: &[String]) -> Option<ScreenEvent> {
    if let Some(info) = detect_tool_request(display) {
        return Some(ScreenEvent {
            view: TerminalView::ToolRequest,
            payload: ViewPayload::ToolRequest(info),
        });
    }

    if display
        .iter()
        .any(|line| AUTH_KEYWORDS.iter().any(|kw| line.contains(kw)))
    {
        return Some(ScreenEvent::bare(TerminalView::AuthRequired));
    }

    if let Some(info) = detect_todo_list(display) {
        return Some(ScreenEvent {
            view: TerminalView::TodoList,
            payload: ViewPayload::Todo(info),
        });
    }

    if let Some(agents) = detect_parallel_agents(display) {
        return Some(ScreenEvent {
            view: TerminalView::ParallelAgents,
            payload: ViewPayload::Agents(agents),
        });
    }

    None
}

fn detect_tool_request(display: &[String]) -> Option<ToolRequestInfo> {
    let selected = display.iter().position(|line| SELECTED_OPTION.is_match(line))?;

    // The menu block: the `❯ 1.` line plus the following numbered options.
    // An approval menu always carries exactly three.
    let mut options = Vec::new();
    for line in display.iter().skip(selected).take(6) {
        if let Some(caps) = NUMBERED_OPTION.captures(line) {
            options.push(caps[2].to_string());
        }
    }
    if options.len() != 3 {
        return None;
    }

    // A selection menu without the cancel hint is not an approval prompt.
    if !display.iter().any(|line| ESC_HINT.is_match(line)) {
        return None;
    }

    // The question sits above the menu, ending in `?`.
    let question = display[..selected]
        .iter()
        .rev()
        .map(|line| line.trim().trim_matches('│').trim())
        .find(|text| text.ends_with('?'))
        .map(str::to_string);

    Some(ToolRequestInfo { question, options })
}

fn detect_todo_list(display: &[String]) -> Option<TodoInfo> {
    let (header_idx, caps) = display
        .iter()
        .enumerate()
        .find_map(|(idx, line)| TODO_HEADER.captures(line).map(|caps| (idx, caps)))?;

    let total = caps[1].parse().ok()?;
    let done = caps[2].parse().ok()?;

    let mut items = Vec::new();
    for line in display.iter().skip(header_idx + 1) {
        match TODO_ITEM.captures(line) {
            Some(caps) => {
                let state = match &caps[1] {
                    "◼" => TodoState::InProgress,
                    "✔" => TodoState::Done,
                    _ => TodoState::Pending,
                };
                items.push((state, caps[2].to_string()));
            }
            None if items.is_empty() => continue,
            None => break,
        }
    }
    if items.is_empty() {
        return None;
    }

    Some(TodoInfo { total, done, items })
}

fn detect_parallel_agents(display: &[String]) -> Option<Vec<AgentInfo>> {
    let header_idx = display
        .iter()
        .position(|line| AGENTS_HEADER.is_match(line))?;

    let mut agents = Vec::new();
    for line in display.iter().skip(header_idx + 1) {
        if let Some(caps) = AGENT_TREE_ROW.captures(line) {
            let text = &caps[1];
            // Rows read `name · Running` / `name · Done`; the name is the
            // part before the dot separator.
            let (name, state) = match text.split_once(" · ") {
                Some((name, state)) => (name.to_string(), state.to_string()),
                None => (text.to_string(), String::new()),
            };
            let done = state.to_lowercase().contains("done");
            agents.push(AgentInfo { name, done });
        } else if line.trim().is_empty() || line.trim_start().starts_with('│') {
            continue;
        } else if !agents.is_empty() {
            break;
        }
    }
    if agents.is_empty() {
        return None;
    }

    Some(agents)
}

// =============================================================================
// Pass 2: bottom-of-screen status idioms
// =============================================================================

fn pass2(display: &[String]) -> Option<ScreenEvent> {
    let start = display.len().saturating_sub(BOTTOM_SCAN_ROWS);
    let bottom = &display[start..];

    if bottom.iter().any(|line| THINKING_ROW.is_match(line)) {
        return Some(ScreenEvent::bare(TerminalView::Thinking));
    }
    if bottom.iter().any(|line| TOOL_RUNNING_ROW.is_match(line)) {
        return Some(ScreenEvent::bare(TerminalView::ToolRunning));
    }
    if bottom.iter().any(|line| TOOL_RESULT_ROW.is_match(line)) {
        return Some(ScreenEvent::bare(TerminalView::ToolResult));
    }
    if bottom.iter().any(|line| BACKGROUND_ROW.is_match(line))
        && bottom.iter().any(|line| BACKGROUND_HINT.is_match(line))
    {
        return Some(ScreenEvent::bare(TerminalView::BackgroundTask));
    }

    None
}

// =============================================================================
// Pass 3: prompt rows and fallbacks
// =============================================================================

fn pass3(display: &[String]) -> ScreenEvent {
    let has_response_marker = display.iter().any(|line| line.contains('⏺'));

    // Empty prompt row framed by separators: the agent is idle.
    for (idx, line) in display.iter().enumerate() {
        if let Some(caps) = PROMPT_ROW.captures(line) {
            let text = caps[1].trim();
            if text.is_empty() && bracketed_by_separators(display, idx) {
                return ScreenEvent::bare(TerminalView::Idle);
            }
        }
    }

    if has_response_marker {
        return ScreenEvent::bare(TerminalView::Streaming);
    }

    for (idx, line) in display.iter().enumerate() {
        if let Some(caps) = PROMPT_ROW.captures(line) {
            let text = caps[1].trim();
            if !text.is_empty() && !bracketed_by_separators(display, idx) {
                return ScreenEvent::bare(TerminalView::UserMessage);
            }
        }
    }

    let logo_in_header = display
        .iter()
        .take(10)
        .any(|line| line.chars().any(|ch| LOGO_GLYPHS.contains(&ch)));
    if logo_in_header && !has_response_marker {
        return ScreenEvent::bare(TerminalView::Startup);
    }

    if display
        .iter()
        .any(|line| ERROR_KEYWORDS.iter().any(|kw| line.contains(kw)))
    {
        return ScreenEvent::bare(TerminalView::Error);
    }

    ScreenEvent::bare(TerminalView::Unknown)
}

/// Whether the row at `idx` has a separator row within 3 rows on both
/// sides, tolerating blank rows in between.
fn bracketed_by_separators(display: &[String], idx: usize) -> bool {
    let above = display[..idx]
        .iter()
        .rev()
        .take(3)
        .any(|line| SEPARATOR_ROW.is_match(line));
    let below = display[idx + 1..]
        .iter()
        .take(3)
        .any(|line| SEPARATOR_ROW.is_match(line));
    above && below
}
