//! Core types shared across the review pipeline.

/// Lifecycle states the remote service reports for one run.
///
/// Anything outside the known set is carried as `Other` so an unrecognized
/// terminal status surfaces as an error instead of an endless poll loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Other(String),
}

impl RunStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => RunStatus::Queued,
            "in_progress" => RunStatus::InProgress,
            "requires_action" => RunStatus::RequiresAction,
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            other => RunStatus::Other(other.to_string()),
        }
    }

    /// True while the run has not yet reached a terminal state.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::RequiresAction
        )
    }
}

/// Snapshot of a run as reported by one status poll.
#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    pub last_error: Option<String>,
}

/// Outcome of one agent's single conversational turn against one file.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub status: RunStatus,
    /// Last assistant message text; empty if the run produced none.
    pub assistant_text: String,
    /// Present iff the run reached `failed`.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
    Other(String),
}

impl MessageRole {
    pub fn parse(s: &str) -> Self {
        match s {
            "user" => MessageRole::User,
            "assistant" => MessageRole::Assistant,
            other => MessageRole::Other(other.to_string()),
        }
    }
}

/// One message in a conversation thread, oldest-to-newest ordering is the
/// caller's responsibility.
#[derive(Debug, Clone)]
pub struct ThreadMessage {
    pub role: MessageRole,
    pub text: String,
}
