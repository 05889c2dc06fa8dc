//! Per-line classification: which rows carry conversation content and which
//! are TUI chrome to strip.

use std::sync::LazyLock;

use regex::Regex;

/// What a single display row is, before any rendering decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Plain continuation content (no marker of its own).
    Content,
    /// `⏺`-prefixed response line.
    Response,
    /// `⎿`-prefixed tool-output connector line.
    ToolConnector,
    Separator,
    StatusBar,
    Thinking,
    ToolHeader,
    Prompt,
    Box,
    Logo,
    Empty,
    DiffDelimiter,
    TodoItem,
    AgentTree,
    Startup,
}

impl LineKind {
    /// Only these kinds contribute text to the outgoing message.
    pub fn is_content_bearing(self) -> bool {
        matches!(
            self,
            LineKind::Content | LineKind::Response | LineKind::ToolConnector
        )
    }
}

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[─━═]{3,}\s*\u{fffd}?\s*$").unwrap());
static DIFF_DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-╌┄]{6,}\s*$").unwrap());
static STARTUP_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(welcome to claude|claude code v\d|/help for help|cwd: )").unwrap()
});
static BOX_FRAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[╭╮╰╯│├┤┬┴┼─━\s]+\u{fffd}?$").unwrap());
static STATUS_BAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)(esc to interrupt|esc to cancel|\? for shortcuts|ctrl\+t to hide|ctrl\+o to expand",
        r"|auto-accept edits|plan mode|bypassing permissions|shift\+tab to cycle",
        r"|\d+% context left|tokens used)"
    ))
    .unwrap()
});
// The approval menu rows: the selected `❯ 1.` row is already a prompt row;
// the unselected `2.`/`3.` options and the question line above them are
// menu chrome too.
static MENU_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[123]\.\s+(Yes|No)\b").unwrap());
static MENU_QUESTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Do you want\b.*\?\s*$").unwrap());
static PROMPT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*│?\s*❯").unwrap());
static THINKING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[✶✳✻✽✢·]\s+\S.*…").unwrap());
static TODO_ITEM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*[◻◼✔]\s+").unwrap());
static AGENT_TREE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\s│]*[├└]─+\s*[^─\s]").unwrap());
static TOOL_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Z][A-Za-z_]*\(.*\)\s*$").unwrap());

const LOGO_GLYPHS: &[char] = &['▐', '▛', '▜', '▌', '▝', '▘'];

/// Classify one display row from its plain text. The tests run in a fixed
/// order, which is the tie-break: earlier kinds win.
pub fn classify_line(text: &str) -> LineKind {
    if text.trim().is_empty() {
        return LineKind::Empty;
    }
    if SEPARATOR.is_match(text) {
        return LineKind::Separator;
    }
    if DIFF_DELIMITER.is_match(text) {
        return LineKind::DiffDelimiter;
    }
    if text.chars().any(|ch| LOGO_GLYPHS.contains(&ch)) {
        return LineKind::Logo;
    }
    if STARTUP_TEXT.is_match(text) {
        return LineKind::Startup;
    }
    if STATUS_BAR.is_match(text) {
        return LineKind::StatusBar;
    }
    if PROMPT.is_match(text) || MENU_OPTION.is_match(text) || MENU_QUESTION.is_match(text) {
        return LineKind::Prompt;
    }
    if THINKING.is_match(text) {
        return LineKind::Thinking;
    }
    if TODO_ITEM.is_match(text) {
        return LineKind::TodoItem;
    }
    if AGENT_TREE.is_match(text) {
        return LineKind::AgentTree;
    }
    if BOX_FRAME.is_match(text) {
        return LineKind::Box;
    }
    let trimmed = text.trim_start();
    if trimmed.starts_with('⏺') {
        return LineKind::Response;
    }
    if trimmed.starts_with('⎿') {
        return LineKind::ToolConnector;
    }
    if TOOL_HEADER.is_match(text) {
        return LineKind::ToolHeader;
    }
    LineKind::Content
}
