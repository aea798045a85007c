//! Agent Transport - Connector Layer
//!
//! Abstracts the remote agent server for the coordinator: a push stream of
//! [`ServerEvent`]s, a stream of connection states, and request/response
//! calls for everything the client pulls on demand.

mod mock;

pub use mock::{Call, Gate, MockFailure, MockTransport};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

use crate::error::Result;
use crate::event::ServerEvent;
use crate::session::{
    AgentStatus, ConnectionState, DiffEntry, FileStatus, LogEntry, PromptMode, StreamKind,
};

// ─────────────────────────────────────────────────────────────────────────────
// Transport Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Bridge trait for talking to the agent server
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Push events, in server order
    fn events(&self) -> Box<dyn Stream<Item = ServerEvent> + Send + Unpin>;

    /// Connection state changes
    fn connection(&self) -> Box<dyn Stream<Item = ConnectionState> + Send + Unpin>;

    async fn fetch_status(&self) -> Result<AgentStatus>;

    /// Working tree status of the session workspace
    async fn fetch_git_status(&self) -> Result<Vec<DiffEntry>>;

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>>;

    /// One page of a session's message history
    async fn fetch_session_messages(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> Result<MessagePage>;

    async fn delete_session(&self, session_id: &str) -> Result<()>;

    async fn delete_all_sessions(&self) -> Result<()>;

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>>;

    async fn read_file(&self, path: &str) -> Result<FileContent>;

    async fn search_files(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// Start or continue a run
    async fn start(&self, request: StartRequest) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Answer a pending question or permission request
    async fn respond(&self, response: InteractionResponse) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Sessions & History
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<HistoryMessage>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
    Tool,
}

/// A persisted message as returned by the history endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryMessage {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Bookkeeping messages the agent never shows to the user
    #[serde(default)]
    pub is_internal: bool,
}

impl HistoryMessage {
    /// Convert to a transcript line; internal and empty messages are skipped
    pub fn into_log_entry(self, session_id: &str) -> Option<LogEntry> {
        if self.is_internal || self.content.trim().is_empty() {
            return None;
        }
        let stream = match self.role {
            MessageRole::User => StreamKind::User,
            MessageRole::Assistant => StreamKind::Stdout,
            MessageRole::System | MessageRole::Tool => StreamKind::System,
        };
        let mut entry = LogEntry::new(self.content, stream, Some(session_id.to_string()));
        entry.id = self.id;
        if let Some(ts) = self.timestamp {
            entry.timestamp = ts;
        }
        Some(entry)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Workspace files
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    pub name: String,
    /// Workspace-relative path, no leading `./`
    pub path: String,
    pub is_dir: bool,
    #[serde(default)]
    pub size: Option<u64>,
    /// Filled locally from the git status map
    #[serde(default, skip_deserializing)]
    pub git_status: Option<FileStatus>,
    /// For directories: some descendant has a git status
    #[serde(default, skip_deserializing)]
    pub has_changes: bool,
}

impl DirEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self::new(path, false)
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self::new(path, true)
    }

    fn new(path: impl Into<String>, is_dir: bool) -> Self {
        let path = path.into();
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        Self {
            name,
            path,
            is_dir,
            size: None,
            git_status: None,
            has_changes: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub truncated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub path: String,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub preview: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub prompt: String,
    pub mode: PromptMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub request_id: String,
    pub reply: Reply,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reply {
    Answer { text: String },
    Permission { allow: bool },
}
