//! Classifier regression corpus: reconstructed screens for every state the
//! agent's TUI is known to draw. Each one must classify to its known label
//! — never to `Unknown` — so a regex tweak that silently stops matching a
//! known screen fails here first.

use claudegram_core::screen::{classify, TerminalView};

struct Fixture {
    name: &'static str,
    rows: &'static [&'static str],
    expected: TerminalView,
}

fn screen(rows: &[&str]) -> Vec<String> {
    let mut display: Vec<String> = rows.iter().map(|row| row.to_string()).collect();
    display.resize(40, String::new());
    display
}

const CORPUS: &[Fixture] = &[
    Fixture {
        name: "startup banner",
        rows: &[
            " ▐▛███▜▌   Claude Code v2.0.1",
            " ▝▜█████▛▘",
            "   ▘▘ ▝▝    Sonnet 4.5 · Claude API",
            "",
            "            cwd: /home/user/myproject",
            "",
            "╭──────────────────────────────────────────╮",
            "│ > Try \"fix the failing test\"             │",
            "╰──────────────────────────────────────────╯",
            "  ? for shortcuts",
        ],
        expected: TerminalView::Startup,
    },
    Fixture {
        name: "idle prompt",
        rows: &[
            " ▐▛███▜▌   Claude Code v2.0.1",
            "",
            "⏺ All done. The tests pass now.",
            "",
            "──────────────────────────────────────────────",
            " ❯ ",
            "──────────────────────────────────────────────",
            "  ? for shortcuts",
        ],
        expected: TerminalView::Idle,
    },
    Fixture {
        name: "user message typed",
        rows: &["❯ please add error handling to the parser"],
        expected: TerminalView::UserMessage,
    },
    Fixture {
        name: "streaming response",
        rows: &[
            "⏺ The parser needs three changes:",
            "",
            "  1. wrap the read in a Result",
            "  2. propagate with ?",
            "  3. add a test for the failure path",
        ],
        expected: TerminalView::Streaming,
    },
    Fixture {
        name: "tool request with diff",
        rows: &[
            "⏺ I'll update the config file.",
            "",
            "  ╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌",
            "  - timeout = 30",
            "  + timeout = 60",
            "  ╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌╌",
            "",
            "  Do you want to make this edit to config.toml?",
            "  ❯ 1. Yes",
            "    2. Yes, and don't ask again this session",
            "    3. No, and tell Claude what to do differently",
            "",
            "  Esc to cancel",
        ],
        expected: TerminalView::ToolRequest,
    },
    Fixture {
        name: "auth prompt",
        rows: &[
            "  Select login method:",
            "",
            "  ❯ 1. Claude account with subscription",
            "    2. Anthropic Console account",
        ],
        expected: TerminalView::AuthRequired,
    },
    Fixture {
        name: "todo panel",
        rows: &[
            "⏺ Working through the plan.",
            "",
            "  4 tasks (2 done · 1 in progress) · ctrl+t to hide tasks",
            "  ✔ Read existing parser",
            "  ✔ Sketch new API",
            "  ◼ Implement error handling",
            "  ◻ Add regression tests",
        ],
        expected: TerminalView::TodoList,
    },
    Fixture {
        name: "parallel agents tree",
        rows: &[
            "⏺ Splitting the work.",
            "",
            "  3 agents launched (ctrl+o to expand)",
            "  ├─ audit-auth · Running",
            "  ├─ audit-storage · Running",
            "  └─ write-summary · Done",
        ],
        expected: TerminalView::ParallelAgents,
    },
    Fixture {
        name: "unknown leftovers",
        rows: &["some stray line the tui never draws", "another one"],
        expected: TerminalView::Unknown,
    },
];

/// Bottom-anchored fixtures: these idioms only count inside the last 8
/// rows of the 40-row grid.
const BOTTOM_CORPUS: &[Fixture] = &[
    Fixture {
        name: "thinking spinner",
        rows: &["✻ Deliberating… (4s · ↓ 1.2k tokens · esc to interrupt)"],
        expected: TerminalView::Thinking,
    },
    Fixture {
        name: "tool running",
        rows: &["  ⎿  Running…", ""],
        expected: TerminalView::ToolRunning,
    },
    Fixture {
        name: "pretooluse hooks",
        rows: &["  ⎿  Running PreToolUse hooks…", ""],
        expected: TerminalView::ToolRunning,
    },
    Fixture {
        name: "tool waiting",
        rows: &["  ⎿  Waiting…", ""],
        expected: TerminalView::ToolRunning,
    },
    Fixture {
        name: "diff applied summary",
        rows: &["  ⎿  Added 14 lines, removed 2 lines", ""],
        expected: TerminalView::ToolResult,
    },
    Fixture {
        name: "background task",
        rows: &[
            "⏺ Dev server running in the background",
            "  ⎿  Use /bashes to manage",
        ],
        expected: TerminalView::BackgroundTask,
    },
];

#[test]
fn corpus_screens_classify_to_known_states() {
    for fixture in CORPUS {
        let display = screen(fixture.rows);
        let event = classify(&display);
        assert_eq!(
            event.view, fixture.expected,
            "fixture {:?} misclassified",
            fixture.name
        );
    }
}

#[test]
fn bottom_corpus_screens_classify_to_known_states() {
    for fixture in BOTTOM_CORPUS {
        let mut display = vec![String::new(); 40];
        let start = 40 - fixture.rows.len();
        for (idx, row) in fixture.rows.iter().enumerate() {
            display[start + idx] = row.to_string();
        }
        let event = classify(&display);
        assert_eq!(
            event.view, fixture.expected,
            "fixture {:?} misclassified",
            fixture.name
        );
    }
}

#[test]
fn no_known_screen_is_unknown() {
    for fixture in CORPUS {
        if fixture.expected == TerminalView::Unknown {
            continue;
        }
        assert_ne!(
            classify(&screen(fixture.rows)).view,
            TerminalView::Unknown,
            "fixture {:?} fell through to Unknown",
            fixture.name
        );
    }
}
