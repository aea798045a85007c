//! Shared helpers for coordinator integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use lookout::event::{InteractionPayload, LogPayload, SessionInfoPayload, StatusUpdate};
use lookout::session::StreamKind;
use lookout::transport::{HistoryMessage, MessageRole, SessionSummary};
use lookout::{
    ClaudeState, ConnectionState, Coordinator, CoordinatorHandle, LookoutConfig, MockTransport,
    ServerEvent, Snapshot,
};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn spawn() -> (Arc<MockTransport>, CoordinatorHandle) {
    spawn_with(LookoutConfig::default())
}

pub fn spawn_with(config: LookoutConfig) -> (Arc<MockTransport>, CoordinatorHandle) {
    let mock = Arc::new(MockTransport::new());
    let handle = Coordinator::spawn(mock.clone(), &config);
    (mock, handle)
}

/// Connect and wait for the connect-time pulls to finish
pub async fn connect(mock: &MockTransport, handle: &CoordinatorHandle) -> Snapshot {
    mock.set_connection(ConnectionState::Connected);
    settle(handle, |s| s.connection == ConnectionState::Connected).await
}

/// Wait for `predicate` with nothing left in flight
pub async fn settle<F>(handle: &CoordinatorHandle, mut predicate: F) -> Snapshot
where
    F: FnMut(&Snapshot) -> bool,
{
    handle
        .wait_for(WAIT, |s| predicate(s) && !s.loading.any())
        .await
        .expect("snapshot condition not reached")
}

/// Poll the mock's call log until `key` was called `n` times
pub async fn wait_calls(mock: &MockTransport, key: &str, n: usize) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while mock.call_count(key) < n {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {} call(s) to {}, saw {}",
            n,
            key,
            mock.call_count(key)
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn status(state: ClaudeState) -> ServerEvent {
    ServerEvent::Status(StatusUpdate::new(state))
}

pub fn session_info(id: &str) -> ServerEvent {
    ServerEvent::SessionInfo(SessionInfoPayload {
        session_id: id.to_string(),
    })
}

pub fn permission(request_id: &str) -> ServerEvent {
    ServerEvent::PermissionRequest(InteractionPayload {
        request_id: request_id.to_string(),
        prompt: "Allow Bash: cargo test?".to_string(),
        tool_name: Some("Bash".to_string()),
        options: vec![],
        input: None,
    })
}

pub fn log(content: &str, session_id: Option<&str>) -> ServerEvent {
    ServerEvent::Log(LogPayload {
        id: None,
        content: content.to_string(),
        stream: StreamKind::Stdout,
        session_id: session_id.map(String::from),
        timestamp: None,
    })
}

pub fn summary(id: &str) -> SessionSummary {
    SessionSummary {
        id: id.to_string(),
        title: Some(format!("session {}", id)),
        updated_at: None,
        message_count: 0,
    }
}

pub fn message(id: &str, role: MessageRole, content: &str) -> HistoryMessage {
    HistoryMessage {
        id: id.to_string(),
        role,
        content: content.to_string(),
        timestamp: None,
        is_internal: false,
    }
}

/// Transcript contents, oldest first
pub fn transcript(snapshot: &Snapshot) -> Vec<String> {
    snapshot.transcript().map(|e| e.content.clone()).collect()
}
