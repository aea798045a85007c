//! Session data model
//!
//! Wire-compatible value types shared by the event envelope, the transport
//! and the snapshots handed to presentation. All of them are plain values:
//! updates construct a new value instead of mutating a shared one.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheEntry;

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

/// Transport connection lifecycle, observed from the transport collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "DISCONNECTED"),
            Self::Connecting => write!(f, "CONNECTING"),
            Self::Connected => write!(f, "CONNECTED"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent status
// ─────────────────────────────────────────────────────────────────────────────

/// Execution state of the remote agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaudeState {
    #[default]
    Idle,
    Running,
    Waiting,
    Error,
    Stopped,
}

impl fmt::Display for ClaudeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Waiting => write!(f, "WAITING"),
            Self::Error => write!(f, "ERROR"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
}

/// Authoritative agent status, replaced wholesale on every update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentStatus {
    pub claude_state: ClaudeState,
    pub session_id: Option<String>,
    pub workspace: Option<WorkspaceInfo>,
    pub connected_clients: u32,
    /// Server uptime in seconds
    pub uptime: u64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Pending interaction
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionKind {
    Question,
    Permission,
}

/// An outstanding question or permission request from the agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInteraction {
    pub request_id: String,
    pub kind: InteractionKind,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Log entries
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    #[default]
    Stdout,
    Stderr,
    System,
    User,
}

impl StreamKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stdout => "out",
            Self::Stderr => "err",
            Self::System => "sys",
            Self::User => "you",
        }
    }
}

/// One line of the session transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub stream: StreamKind,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl LogEntry {
    pub fn new(content: impl Into<String>, stream: StreamKind, session_id: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            content: content.into(),
            stream,
            session_id,
        }
    }

    /// Locally echoed user input
    pub fn user(content: impl Into<String>, session_id: Option<String>) -> Self {
        Self::new(content, StreamKind::User, session_id)
    }
}

impl CacheEntry for LogEntry {
    type Key = String;

    fn cache_key(&self) -> String {
        self.id.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Diff entries
// ─────────────────────────────────────────────────────────────────────────────

/// Version-control status of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Modified,
    Added,
    Deleted,
    Untracked,
    Renamed,
}

impl FileStatus {
    pub fn marker(&self) -> char {
        match self {
            Self::Modified => 'M',
            Self::Added => 'A',
            Self::Deleted => 'D',
            Self::Untracked => '?',
            Self::Renamed => 'R',
        }
    }
}

/// Most recent known diff for one path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffEntry {
    pub path: String,
    #[serde(default)]
    pub status: FileStatus,
    #[serde(default)]
    pub diff: Option<String>,
    #[serde(default)]
    pub additions: u32,
    #[serde(default)]
    pub deletions: u32,
}

impl DiffEntry {
    pub fn new(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            diff: None,
            additions: 0,
            deletions: 0,
        }
    }
}

impl CacheEntry for DiffEntry {
    type Key = String;

    fn cache_key(&self) -> String {
        self.path.clone()
    }
}
