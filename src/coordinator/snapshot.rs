//! Immutable view of coordinator state handed to presentation

use crate::browse::BrowserSnapshot;
use crate::error::ErrorNotice;
use crate::session::{
    AgentStatus, ClaudeState, ConnectionState, DiffEntry, LogEntry, PendingInteraction,
};
use crate::transport::SessionSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadingFlags {
    pub status: bool,
    pub history: bool,
    pub diff: bool,
    pub sessions: bool,
    pub directory: bool,
    pub file: bool,
    pub search: bool,
}

impl LoadingFlags {
    pub fn any(&self) -> bool {
        self.status
            || self.history
            || self.diff
            || self.sessions
            || self.directory
            || self.file
            || self.search
    }
}

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Bumped on every published update
    pub revision: u64,
    /// Push events dispatched so far
    pub events_applied: u64,
    pub connection: ConnectionState,
    pub status: AgentStatus,
    pub claude_state: ClaudeState,
    pub session_id: Option<String>,
    pub pending: Option<PendingInteraction>,
    /// Most recent first
    pub logs: Vec<LogEntry>,
    /// Most recent first
    pub diffs: Vec<DiffEntry>,
    pub sessions: Vec<SessionSummary>,
    pub browser: BrowserSnapshot,
    pub loading: LoadingFlags,
    pub last_error: Option<ErrorNotice>,
}

impl Snapshot {
    /// Log entries in reading order (oldest first)
    pub fn transcript(&self) -> impl Iterator<Item = &LogEntry> {
        self.logs.iter().rev()
    }
}
