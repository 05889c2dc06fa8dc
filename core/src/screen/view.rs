//! Semantic labels for a full terminal display.

/// What the agent's TUI is showing, as far as the bridge is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalView {
    Startup,
    Idle,
    UserMessage,
    Thinking,
    Streaming,
    ToolRequest,
    AuthRequired,
    ToolRunning,
    ToolResult,
    TodoList,
    ParallelAgents,
    BackgroundTask,
    Error,
    Unknown,
}

impl TerminalView {
    /// All variants, for table validation.
    pub const ALL: [TerminalView; 14] = [
        TerminalView::Startup,
        TerminalView::Idle,
        TerminalView::UserMessage,
        TerminalView::Thinking,
        TerminalView::Streaming,
        TerminalView::ToolRequest,
        TerminalView::AuthRequired,
        TerminalView::ToolRunning,
        TerminalView::ToolResult,
        TerminalView::TodoList,
        TerminalView::ParallelAgents,
        TerminalView::BackgroundTask,
        TerminalView::Error,
        TerminalView::Unknown,
    ];
}

/// Parsed tool-approval prompt: the question line (when present) and the
/// option texts in menu order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolRequestInfo {
    pub question: Option<String>,
    pub options: Vec<String>,
}

/// Checkbox state of one todo entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoState {
    Pending,
    InProgress,
    Done,
}

/// Parsed todo panel: header counts plus the visible items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TodoInfo {
    pub total: usize,
    pub done: usize,
    pub items: Vec<(TodoState, String)>,
}

/// One sub-agent row from the parallel-agents tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentInfo {
    pub name: String,
    pub done: bool,
}

/// Observation-specific data attached to a classification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ViewPayload {
    #[default]
    None,
    ToolRequest(ToolRequestInfo),
    Todo(TodoInfo),
    Agents(Vec<AgentInfo>),
}

/// The classifier's result: exactly one view per display snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenEvent {
    pub view: TerminalView,
    pub payload: ViewPayload,
}

impl ScreenEvent {
    pub fn bare(view: TerminalView) -> Self {
        ScreenEvent {
            view,
            payload: ViewPayload::None,
        }
    }
}
