//! End-to-end pipeline scenarios: synthetic PTY byte streams in, recorded
//! messenger traffic out.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use claudegram_core::error::CoreError;
use claudegram_core::messenger::{Button, ChatRef, EditOutcome, MessageRef, Messenger};
use claudegram_core::pipeline::{Pipeline, PipelinePhase};
use claudegram_core::render::MESSAGE_LIMIT;
use claudegram_core::stream::EditLimiter;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Send(String),
    Edit(i32, String),
    Keyboard(String, Vec<String>),
    RemoveKeyboard(i32),
    Typing,
}

#[derive(Default)]
struct MockApi {
    calls: Mutex<Vec<Call>>,
    next_id: Mutex<i32>,
}

impl MockApi {
    fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Send(text) | Call::Edit(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn keyboard_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Keyboard(..)))
            .count()
    }
}

#[async_trait]
impl Messenger for MockApi {
    async fn send_text(&self, _chat: ChatRef, html: &str) -> Result<MessageRef, CoreError> {
        self.calls.lock().push(Call::Send(html.to_string()));
        let mut id = self.next_id.lock();
        *id += 1;
        Ok(MessageRef(*id))
    }

    async fn edit_text(&self, _chat: ChatRef, message: MessageRef, html: &str) -> EditOutcome {
        self.calls.lock().push(Call::Edit(message.0, html.to_string()));
        EditOutcome::Ok
    }

    async fn send_keyboard(
        &self,
        _chat: ChatRef,
        html: &str,
        buttons: &[Button],
    ) -> Result<MessageRef, CoreError> {
        self.calls.lock().push(Call::Keyboard(
            html.to_string(),
            buttons.iter().map(|button| button.data.clone()).collect(),
        ));
        let mut id = self.next_id.lock();
        *id += 1;
        Ok(MessageRef(*id))
    }

    async fn remove_keyboard(&self, _chat: ChatRef, message: MessageRef) -> Result<(), CoreError> {
        self.calls.lock().push(Call::RemoveKeyboard(message.0));
        Ok(())
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        _text: Option<&str>,
    ) -> Result<(), CoreError> {
        Ok(())
    }

    async fn delete_message(&self, _chat: ChatRef, _message: MessageRef) -> Result<(), CoreError> {
        Ok(())
    }

    async fn send_document(
        &self,
        _chat: ChatRef,
        _path: &Path,
        _caption: Option<&str>,
    ) -> Result<MessageRef, CoreError> {
        let mut id = self.next_id.lock();
        *id += 1;
        Ok(MessageRef(*id))
    }

    async fn typing(&self, _chat: ChatRef) -> Result<(), CoreError> {
        self.calls.lock().push(Call::Typing);
        Ok(())
    }
}

/// Clear the grid and draw rows from the top, 1-based.
fn paint(pipe: &mut Pipeline<MockApi>, rows: &[&str]) {
    pipe.feed(b"\x1b[2J\x1b[H");
    for (idx, row) in rows.iter().enumerate() {
        pipe.feed(format!("\x1b[{};1H{}", idx + 1, row).as_bytes());
    }
}

/// Draw one row near the bottom of the grid (inside the status scan area).
fn paint_bottom(pipe: &mut Pipeline<MockApi>, row: &str) {
    pipe.feed(format!("\x1b[39;1H\x1b[2K{row}").as_bytes());
}

async fn settle(pipe: &mut Pipeline<MockApi>) {
    tokio::time::advance(Duration::from_millis(1100)).await;
    pipe.tick().await;
}

const IDLE_TAIL: &[&str] = &[
    "──────────────────────────────",
    " ❯ ",
    "──────────────────────────────",
];

fn new_pipeline(api: &Arc<MockApi>) -> Pipeline<MockApi> {
    Pipeline::new(Arc::clone(api), ChatRef(1), EditLimiter::default())
}

#[tokio::test(start_paused = true)]
async fn fast_answer_produces_placeholder_then_single_replace() {
    let api = Arc::new(MockApi::default());
    let mut pipe = new_pipeline(&api);

    // Startup banner, then the user's prompt goes in.
    paint(&mut pipe, &[" ▐▛███▜▌  Claude Code v2.0"]);
    pipe.tick().await;

    // Thinking.
    paint_bottom(&mut pipe, "✶ Pondering… (1s · esc to interrupt)");
    pipe.tick().await;

    // Streaming the answer.
    tokio::time::advance(Duration::from_millis(300)).await;
    paint(&mut pipe, &["⏺ 4"]);
    pipe.tick().await;

    // Idle: the response is over.
    tokio::time::advance(Duration::from_millis(1100)).await;
    let mut idle_rows = vec!["⏺ 4", ""];
    idle_rows.extend_from_slice(IDLE_TAIL);
    paint(&mut pipe, &idle_rows);
    pipe.tick().await;

    assert_eq!(pipe.phase(), PipelinePhase::Dormant);
    let calls = api.calls();
    assert_eq!(calls[0], Call::Typing);
    assert_eq!(calls[1], Call::Send("Thinking…".into()));
    assert_eq!(calls.last(), Some(&Call::Edit(1, "4".into())));
    // One placeholder send, one content edit, nothing else text-bearing.
    assert_eq!(api.texts(), vec!["Thinking…".to_string(), "4".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn tool_approval_keyboard_once_then_stream_resumes_in_same_message() {
    let api = Arc::new(MockApi::default());
    let mut pipe = new_pipeline(&api);

    // Thinking, then streaming intent.
    paint_bottom(&mut pipe, "✻ Crafting… (1s · esc to interrupt)");
    pipe.tick().await;

    tokio::time::advance(Duration::from_millis(1100)).await;
    paint(&mut pipe, &["⏺ I'll create the file for you."]);
    pipe.tick().await;

    // The approval prompt appears.
    tokio::time::advance(Duration::from_millis(1100)).await;
    paint(
        &mut pipe,
        &[
            "⏺ I'll create the file for you.",
            "",
            "  Do you want to create /tmp/test.txt?",
            "  ❯ 1. Yes",
            "    2. Yes, and don't ask again this session",
            "    3. No, and tell Claude what to do differently",
            "  Esc to cancel",
        ],
    );
    pipe.tick().await;
    assert_eq!(pipe.phase(), PipelinePhase::ToolPending);
    assert_eq!(api.keyboard_count(), 1);

    // Same screen again: still exactly one keyboard.
    settle(&mut pipe).await;
    assert_eq!(api.keyboard_count(), 1);

    // User taps "Yes": the bot layer clears the guard and pokes the PTY.
    let keyboard_message = pipe.resolve_tool_request().expect("keyboard message");
    assert!(keyboard_message.0 > 0);

    // Tool runs, then the confirmation streams into the ORIGINAL message.
    paint(&mut pipe, &["⏺ I'll create the file for you."]);
    paint_bottom(&mut pipe, "  ⎿  Running…");
    pipe.tick().await;
    assert_eq!(pipe.phase(), PipelinePhase::Streaming);

    tokio::time::advance(Duration::from_millis(1100)).await;
    paint(
        &mut pipe,
        &[
            "⏺ I'll create the file for you.",
            "",
            "⏺ Created /tmp/test.txt with the requested content.",
        ],
    );
    pipe.tick().await;

    tokio::time::advance(Duration::from_millis(1100)).await;
    let mut idle_rows = vec![
        "⏺ I'll create the file for you.",
        "",
        "⏺ Created /tmp/test.txt with the requested content.",
        "",
    ];
    idle_rows.extend_from_slice(IDLE_TAIL);
    paint(&mut pipe, &idle_rows);
    pipe.tick().await;
    // Deferred edits drain.
    settle(&mut pipe).await;

    assert_eq!(pipe.phase(), PipelinePhase::Dormant);
    // The keyboard was a separate message and never carried content; the
    // conversation text all flowed through live messages.
    let final_text = api
        .texts()
        .into_iter()
        .last()
        .expect("at least one content message");
    assert!(final_text.contains("Created /tmp/test.txt"));
    assert!(final_text.contains("I'll create the file for you."));
    assert_eq!(api.keyboard_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn long_code_block_rolls_over_to_second_message() {
    let api = Arc::new(MockApi::default());
    let mut pipe = new_pipeline(&api);

    // First screenful of code: grey rows read as a code block.
    let chunk_a: Vec<String> = (0..30)
        .map(|idx| format!("\x1b[90m{}{:03}\x1b[0m", "a".repeat(100), idx))
        .collect();
    let mut rows: Vec<&str> = vec!["⏺ Here is the generated module:"];
    rows.extend(chunk_a.iter().map(String::as_str));
    paint(&mut pipe, &rows);
    pipe.tick().await;

    // The TUI scrolls on: a second screenful of different code.
    tokio::time::advance(Duration::from_millis(1100)).await;
    let chunk_b: Vec<String> = (0..30)
        .map(|idx| format!("\x1b[90m{}{:03}\x1b[0m", "b".repeat(100), idx))
        .collect();
    let mut rows: Vec<&str> = vec!["⏺ Continuing:"];
    rows.extend(chunk_b.iter().map(String::as_str));
    paint(&mut pipe, &rows);
    pipe.tick().await;
    settle(&mut pipe).await;

    // Finish.
    let mut idle_rows: Vec<&str> = chunk_b.iter().map(String::as_str).collect();
    idle_rows.truncate(20);
    idle_rows.extend_from_slice(IDLE_TAIL);
    paint(&mut pipe, &idle_rows);
    settle(&mut pipe).await;
    settle(&mut pipe).await;

    let sends: Vec<String> = api
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Send(text) => Some(text),
            _ => None,
        })
        .collect();
    assert!(sends.len() >= 2, "expected an overflow rollover: {sends:?}");

    // Every outbound body respects the hard limit, and the rollover
    // carried the code fence across the split.
    for text in api.texts() {
        assert!(text.chars().count() <= MESSAGE_LIMIT, "oversized message");
    }
    let follow_up = &sends[1];
    assert!(
        follow_up.starts_with("<pre>"),
        "follow-up did not reopen the code block: {follow_up:?}"
    );
}

#[tokio::test(start_paused = true)]
async fn decline_finalizes_original_message_without_orphan_state() {
    let api = Arc::new(MockApi::default());
    let mut pipe = new_pipeline(&api);

    paint(&mut pipe, &["⏺ I'll run the command."]);
    pipe.tick().await;

    tokio::time::advance(Duration::from_millis(1100)).await;
    paint(
        &mut pipe,
        &[
            "⏺ I'll run the command.",
            "  Do you want to run rm -rf target?",
            "  ❯ 1. Yes",
            "    2. Yes, and don't ask again this session",
            "    3. No, and tell Claude what to do differently",
            "  Esc to cancel",
        ],
    );
    pipe.tick().await;
    assert_eq!(pipe.phase(), PipelinePhase::ToolPending);

    // User taps "No".
    pipe.resolve_tool_request().expect("keyboard message");
    assert!(!pipe.tool_request_pending());

    // The agent acknowledges the decline and goes idle.
    paint(&mut pipe, &["⏺ Understood, I won't run it."]);
    pipe.tick().await;
    assert_eq!(pipe.phase(), PipelinePhase::Streaming);

    tokio::time::advance(Duration::from_millis(1100)).await;
    let mut idle_rows = vec!["⏺ Understood, I won't run it.", ""];
    idle_rows.extend_from_slice(IDLE_TAIL);
    paint(&mut pipe, &idle_rows);
    pipe.tick().await;
    settle(&mut pipe).await;

    assert_eq!(pipe.phase(), PipelinePhase::Dormant);
    let final_text = api.texts().into_iter().last().expect("content");
    assert!(final_text.contains("won't run it"));
}
