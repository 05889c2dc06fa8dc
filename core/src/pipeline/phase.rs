//! Per-session behavioral phase.

/// Where the bridge currently is in one session's conversation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    /// Idle: no live message.
    Dormant,
    /// Placeholder sent, typing indicator active.
    Thinking,
    /// Content flowing, editing the live message in place.
    Streaming,
    /// Approval keyboard sent, waiting for the user to act.
    ToolPending,
}

impl PipelinePhase {
    /// All variants, for table validation.
    pub const ALL: [PipelinePhase; 4] = [
        PipelinePhase::Dormant,
        PipelinePhase::Thinking,
        PipelinePhase::Streaming,
        PipelinePhase::ToolPending,
    ];
}
