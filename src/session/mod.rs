//! Session and agent state
//!
//! - `types`: value types for status, interactions, log and diff entries
//! - `machine`: `SessionState`, the state machine driven by status updates

mod machine;
mod types;

pub use machine::{ConnectionChange, PromptMode, SessionState, Submission, Transition};
pub use types::{
    AgentStatus, ClaudeState, ConnectionState, DiffEntry, FileStatus, InteractionKind, LogEntry,
    PendingInteraction, StreamKind, WorkspaceInfo,
};
