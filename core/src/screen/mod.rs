//! Screen classification: one `TerminalView` per display snapshot.

mod classifier;
mod view;

pub use classifier::classify;
pub use view::{
    AgentInfo, ScreenEvent, TerminalView, TodoInfo, TodoState, ToolRequestInfo, ViewPayload,
};
