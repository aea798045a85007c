//! ServerEvent - typed envelope for the push stream
//!
//! Wire shape: `{"type": "<discriminant>", "payload": {...}}`, one JSON
//! object per event. Payload field names are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::{
    AgentStatus, ClaudeState, DiffEntry, FileStatus, InteractionKind, LogEntry,
    PendingInteraction, StreamKind, WorkspaceInfo,
};

/// All inbound event kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    Log(LogPayload),
    Status(StatusUpdate),
    SessionInfo(SessionInfoPayload),
    Waiting(InteractionPayload),
    PermissionRequest(InteractionPayload),
    Diff(DiffEntry),
    FileChanged(FileChangedPayload),
    /// Reply to a status poll, routed through the same dispatch path
    StatusResponse(AgentStatus),
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Wire discriminant, for logging
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::Status(_) => "status",
            Self::SessionInfo(_) => "sessionInfo",
            Self::Waiting(_) => "waiting",
            Self::PermissionRequest(_) => "permissionRequest",
            Self::Diff(_) => "diff",
            Self::FileChanged(_) => "fileChanged",
            Self::StatusResponse(_) => "statusResponse",
            Self::Error(_) => "error",
        }
    }

    /// Short human-readable description
    pub fn description(&self) -> String {
        match self {
            Self::Log(log) => {
                let preview: String = log.content.chars().take(50).collect();
                if preview.len() < log.content.len() {
                    format!("Log [{}]: {}...", log.stream.label(), preview)
                } else {
                    format!("Log [{}]: {}", log.stream.label(), preview)
                }
            }
            Self::Status(update) => format!("Status: {}", update.claude_state),
            Self::SessionInfo(info) => format!("Session: {}", info.session_id),
            Self::Waiting(p) => format!("Question {}: {}", p.request_id, p.prompt),
            Self::PermissionRequest(p) => format!(
                "Permission {}: {}",
                p.request_id,
                p.tool_name.as_deref().unwrap_or("(tool)")
            ),
            Self::Diff(diff) => format!("Diff: {} [{}]", diff.path, diff.status.marker()),
            Self::FileChanged(change) => format!("File {:?}: {}", change.change, change.path),
            Self::StatusResponse(status) => format!("Status response: {}", status.claude_state),
            Self::Error(err) => format!("Error: {}", err.message),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogPayload {
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub stream: StreamKind,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl LogPayload {
    /// Build a cache entry, generating id/timestamp when the server omits them
    pub fn into_entry(self) -> LogEntry {
        let mut entry = LogEntry::new(self.content, self.stream, self.session_id);
        if let Some(id) = self.id {
            entry.id = id;
        }
        if let Some(ts) = self.timestamp {
            entry.timestamp = ts;
        }
        entry
    }
}

/// Partial status carried by `status` events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub claude_state: ClaudeState,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub workspace: Option<WorkspaceInfo>,
    #[serde(default)]
    pub connected_clients: Option<u32>,
    #[serde(default)]
    pub uptime: Option<u64>,
}

impl StatusUpdate {
    pub fn new(claude_state: ClaudeState) -> Self {
        Self {
            claude_state,
            session_id: None,
            workspace: None,
            connected_clients: None,
            uptime: None,
        }
    }

    /// Construct the next status value; fields absent from the update keep
    /// their previous values.
    pub fn apply_to(&self, base: &AgentStatus) -> AgentStatus {
        AgentStatus {
            claude_state: self.claude_state,
            session_id: self.session_id.clone().or_else(|| base.session_id.clone()),
            workspace: self.workspace.clone().or_else(|| base.workspace.clone()),
            connected_clients: self.connected_clients.unwrap_or(base.connected_clients),
            uptime: self.uptime.unwrap_or(base.uptime),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfoPayload {
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionPayload {
    pub request_id: String,
    #[serde(default, alias = "question", alias = "message")]
    pub prompt: String,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

impl InteractionPayload {
    pub fn into_pending(self, kind: InteractionKind) -> PendingInteraction {
        PendingInteraction {
            request_id: self.request_id,
            kind,
            prompt: self.prompt,
            tool_name: self.tool_name,
            options: self.options,
            input: self.input,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Created,
    Modified,
    Deleted,
    Renamed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChangedPayload {
    pub path: String,
    pub change: ChangeType,
}

impl FileChangedPayload {
    /// Diff entry to upsert; `None` for deletions
    pub fn to_diff_entry(&self) -> Option<DiffEntry> {
        let status = match self.change {
            ChangeType::Created => FileStatus::Added,
            ChangeType::Modified => FileStatus::Modified,
            ChangeType::Renamed => FileStatus::Renamed,
            ChangeType::Deleted => return None,
        };
        Some(DiffEntry::new(self.path.clone(), status))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_log_event() {
        let event: ServerEvent = serde_json::from_value(json!({
            "type": "log",
            "payload": { "content": "building...", "stream": "stderr", "sessionId": "s1" }
        }))
        .unwrap();

        match event {
            ServerEvent::Log(log) => {
                assert_eq!(log.stream, StreamKind::Stderr);
                let entry = log.into_entry();
                assert_eq!(entry.session_id.as_deref(), Some("s1"));
                assert!(!entry.id.is_empty());
            }
            other => panic!("expected log, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_permission_request() {
        let event: ServerEvent = serde_json::from_value(json!({
            "type": "permissionRequest",
            "payload": { "requestId": "r7", "toolName": "Bash", "input": { "command": "ls" } }
        }))
        .unwrap();
        assert_eq!(event.kind_name(), "permissionRequest");

        let ServerEvent::PermissionRequest(payload) = event else {
            panic!("wrong variant");
        };
        let pending = payload.into_pending(InteractionKind::Permission);
        assert_eq!(pending.request_id, "r7");
        assert_eq!(pending.tool_name.as_deref(), Some("Bash"));
    }

    #[test]
    fn test_waiting_accepts_question_alias() {
        let event: ServerEvent = serde_json::from_value(json!({
            "type": "waiting",
            "payload": { "requestId": "q1", "question": "Which branch?" }
        }))
        .unwrap();
        let ServerEvent::Waiting(payload) = event else {
            panic!("wrong variant");
        };
        assert_eq!(payload.prompt, "Which branch?");
    }

    #[test]
    fn test_status_update_keeps_missing_fields() {
        let base = AgentStatus {
            claude_state: ClaudeState::Idle,
            session_id: Some("s1".into()),
            connected_clients: 3,
            uptime: 10,
            ..AgentStatus::default()
        };
        let mut update = StatusUpdate::new(ClaudeState::Running);
        update.uptime = Some(12);

        let next = update.apply_to(&base);
        assert_eq!(next.claude_state, ClaudeState::Running);
        assert_eq!(next.session_id.as_deref(), Some("s1"));
        assert_eq!(next.connected_clients, 3);
        assert_eq!(next.uptime, 12);
        // base untouched
        assert_eq!(base.claude_state, ClaudeState::Idle);
    }

    #[test]
    fn test_file_changed_deleted_has_no_entry() {
        let deleted = FileChangedPayload {
            path: "a.rs".into(),
            change: ChangeType::Deleted,
        };
        assert!(deleted.to_diff_entry().is_none());

        let created = FileChangedPayload {
            path: "b.rs".into(),
            change: ChangeType::Created,
        };
        assert_eq!(created.to_diff_entry().unwrap().status, FileStatus::Added);
    }

    #[test]
    fn test_roundtrip_discriminant() {
        let event = ServerEvent::SessionInfo(SessionInfoPayload {
            session_id: "abc".into(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "sessionInfo");
        assert_eq!(value["payload"]["sessionId"], "abc");
    }

    #[test]
    fn test_description_truncates_long_logs() {
        let event = ServerEvent::Log(LogPayload {
            id: None,
            content: "x".repeat(80),
            stream: StreamKind::Stdout,
            session_id: None,
            timestamp: None,
        });
        assert!(event.description().ends_with("..."));
    }
}
