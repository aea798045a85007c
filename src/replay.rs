//! Replay - drive the coordinator from a recorded event stream
//!
//! A recording is newline-delimited JSON. Each line is either a
//! [`ServerEvent`] envelope or a connection change:
//!
//! ```text
//! {"connection": "connected"}
//! {"type": "status", "payload": {"claudeState": "running"}}
//! {"type": "log", "payload": {"content": "Compiling...", "sessionId": "s1"}}
//! ```
//!
//! Lines are fed one at a time through a [`MockTransport`]. Each line, and
//! any pulls it triggers, settles before the next is sent, so connection
//! changes and events keep their recorded order. The mock mirrors what the
//! recording has revealed about the server (status, git status, per-session
//! history) so pulls triggered during replay see consistent data.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::config::LookoutConfig;
use crate::coordinator::{Coordinator, Snapshot};
use crate::error::{LookoutError, Result};
use crate::event::ServerEvent;
use crate::session::{AgentStatus, ConnectionState, DiffEntry, StreamKind};
use crate::transport::{HistoryMessage, MessageRole, MockTransport};

const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// One line of a recording
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ReplayLine {
    Connection { connection: ConnectionState },
    Event(ServerEvent),
}

/// Parse a recording; blank lines and `#` comments are skipped
pub fn parse_recording(text: &str) -> Result<Vec<ReplayLine>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| LookoutError::Recording {
                line: index + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Run every line through a fresh coordinator and return the settled snapshot
pub async fn replay(lines: Vec<ReplayLine>, config: &LookoutConfig) -> Result<Snapshot> {
    let transport = Arc::new(MockTransport::new());
    let handle = Coordinator::spawn(transport.clone(), config);
    let mut mirror = ServerMirror::default();
    let mut events_sent = 0u64;

    for line in lines {
        match line {
            ReplayLine::Connection { connection } => {
                debug!(%connection, "replay connection");
                transport.set_connection(connection);
                handle
                    .wait_for(STEP_TIMEOUT, |s| s.connection == connection && !s.loading.any())
                    .await?;
            }
            ReplayLine::Event(event) => {
                mirror.observe(&event);
                mirror.publish(&transport);
                transport.emit(event);
                events_sent += 1;
                handle
                    .wait_for(STEP_TIMEOUT, |s| {
                        s.events_applied >= events_sent && !s.loading.any()
                    })
                    .await?;
            }
        }
    }

    let snapshot = handle
        .wait_for(STEP_TIMEOUT, |s| !s.loading.any())
        .await?;
    handle.shutdown().await?;
    Ok(snapshot)
}

// ─────────────────────────────────────────────────────────────────────────────
// Server mirror
// ─────────────────────────────────────────────────────────────────────────────

/// Server-side state implied by the events seen so far
#[derive(Debug, Default)]
struct ServerMirror {
    status: AgentStatus,
    session_id: Option<String>,
    diffs: Vec<DiffEntry>,
    histories: HashMap<String, Vec<HistoryMessage>>,
}

impl ServerMirror {
    fn observe(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::Log(log) => {
                if let Some(id) = log.session_id.as_deref().filter(|id| !id.is_empty()) {
                    self.session_id = Some(id.to_string());
                }
                let Some(session_id) = self.session_id.clone() else {
                    return;
                };
                let role = match log.stream {
                    StreamKind::User => MessageRole::User,
                    StreamKind::System => MessageRole::System,
                    StreamKind::Stdout | StreamKind::Stderr => MessageRole::Assistant,
                };
                self.histories
                    .entry(session_id)
                    .or_default()
                    .push(HistoryMessage {
                        id: log
                            .id
                            .clone()
                            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                        role,
                        content: log.content.clone(),
                        timestamp: log.timestamp,
                        is_internal: false,
                    });
            }
            ServerEvent::Status(update) => {
                self.status = update.apply_to(&self.status);
                self.track_session(self.status.session_id.clone());
            }
            ServerEvent::StatusResponse(status) => {
                self.status = status.clone();
                self.track_session(status.session_id.clone());
            }
            ServerEvent::SessionInfo(info) => self.track_session(Some(info.session_id.clone())),
            ServerEvent::Diff(entry) => self.upsert_diff(entry.clone()),
            ServerEvent::FileChanged(change) => match change.to_diff_entry() {
                Some(entry) => self.upsert_diff(entry),
                None => self.diffs.retain(|d| d.path != change.path),
            },
            ServerEvent::Waiting(_) | ServerEvent::PermissionRequest(_) | ServerEvent::Error(_) => {}
        }
    }

    fn track_session(&mut self, session_id: Option<String>) {
        if let Some(id) = session_id.filter(|id| !id.is_empty()) {
            self.session_id = Some(id);
        }
    }

    fn upsert_diff(&mut self, entry: DiffEntry) {
        match self.diffs.iter_mut().find(|d| d.path == entry.path) {
            Some(existing) => *existing = entry,
            None => self.diffs.push(entry),
        }
    }

    fn publish(&self, transport: &MockTransport) {
        transport.set_status(self.status.clone());
        transport.set_git_status(self.diffs.clone());
        for (session_id, messages) in &self.histories {
            transport.set_history(session_id, messages.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ClaudeState, FileStatus};

    const RECORDING: &str = r#"
# session start
{"connection": "connected"}
{"type": "sessionInfo", "payload": {"sessionId": "s1"}}
{"type": "status", "payload": {"claudeState": "running"}}
{"type": "log", "payload": {"content": "Reading src/lib.rs", "stream": "stdout"}}
{"type": "diff", "payload": {"path": "src/lib.rs", "status": "modified", "additions": 3}}
{"type": "status", "payload": {"claudeState": "idle"}}
"#;

    #[test]
    fn test_parse_recording_skips_comments() {
        let lines = parse_recording(RECORDING).unwrap();
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            ReplayLine::Connection {
                connection: ConnectionState::Connected
            }
        );
        assert!(matches!(lines[1], ReplayLine::Event(ServerEvent::SessionInfo(_))));
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = parse_recording("{\"connection\": \"connected\"}\n{not json}").unwrap_err();
        match err {
            LookoutError::Recording { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replay_settles_final_state() {
        let lines = parse_recording(RECORDING).unwrap();
        let snapshot = replay(lines, &LookoutConfig::default()).await.unwrap();

        assert_eq!(snapshot.connection, ConnectionState::Connected);
        assert_eq!(snapshot.claude_state, ClaudeState::Idle);
        assert_eq!(snapshot.session_id.as_deref(), Some("s1"));
        assert_eq!(snapshot.events_applied, 5);
        // the post-run diff refresh is served from the mirrored git status
        assert_eq!(snapshot.diffs.len(), 1);
        assert_eq!(snapshot.diffs[0].status, FileStatus::Modified);
        assert_eq!(snapshot.logs[0].content, "Reading src/lib.rs");
    }
}
