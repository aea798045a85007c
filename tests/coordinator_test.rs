//! Coordinator Integration Tests
//!
//! Drives a spawned coordinator through `MockTransport`:
//! - status transitions, diff refresh and pending interactions
//! - prompt routing and optimistic echo
//! - session switch, reconnect resync and session deletion

mod common;

use common::*;
use pretty_assertions::assert_eq;

use lookout::transport::{Call, InteractionResponse, MessageRole, MockFailure, Reply};
use lookout::{
    ClaudeState, ConnectionState, DiffEntry, ErrorKind, FileStatus, Intent, Notification,
    ServerEvent,
};

// ═══════════════════════════════════════════
// Status & diff
// ═══════════════════════════════════════════

#[tokio::test]
async fn test_running_to_idle_refreshes_diff_exactly_once() {
    let (mock, handle) = spawn();
    connect(&mock, &handle).await;
    let baseline = mock.call_count("git_status");

    mock.set_git_status(vec![DiffEntry::new("src/main.rs", FileStatus::Modified)]);
    mock.emit(status(ClaudeState::Running));
    mock.emit(status(ClaudeState::Idle));

    let snap = settle(&handle, |s| s.events_applied == 2).await;
    assert_eq!(mock.call_count("git_status"), baseline + 1);
    assert_eq!(snap.diffs.len(), 1);
    assert_eq!(snap.claude_state, ClaudeState::Idle);
}

#[tokio::test]
async fn test_connect_fetches_status() {
    let (mock, handle) = spawn();
    mock.set_status(lookout::AgentStatus {
        claude_state: ClaudeState::Running,
        connected_clients: 2,
        ..Default::default()
    });

    let snap = connect(&mock, &handle).await;
    assert_eq!(mock.call_count("status"), 1);
    assert_eq!(snap.claude_state, ClaudeState::Running);
    assert_eq!(snap.status.connected_clients, 2);
}

#[tokio::test]
async fn test_error_event_is_surfaced_and_processing_continues() {
    let (mock, handle) = spawn();
    mock.emit(ServerEvent::Error(lookout::event::ErrorPayload {
        message: "tool crashed".into(),
        code: None,
    }));
    mock.emit(status(ClaudeState::Running));

    let snap = settle(&handle, |s| s.events_applied == 2).await;
    let error = snap.last_error.expect("error surfaced");
    assert_eq!(error.kind, ErrorKind::Command);
    assert_eq!(snap.claude_state, ClaudeState::Running);
}

// ═══════════════════════════════════════════
// Pending interactions & prompts
// ═══════════════════════════════════════════

#[tokio::test]
async fn test_submit_while_waiting_answers_pending_request() {
    let (mock, handle) = spawn();
    mock.emit(status(ClaudeState::Waiting));
    mock.emit(permission("r1"));
    settle(&handle, |s| s.pending.is_some()).await;

    handle
        .send(Intent::SubmitPrompt("yes, go ahead".into()))
        .await
        .unwrap();

    let snap = settle(&handle, |s| s.logs.len() == 1).await;
    assert!(snap.pending.is_none());

    wait_calls(&mock, "respond", 1).await;
    assert_eq!(mock.call_count("start"), 0);
    assert!(mock.calls().contains(&Call::Respond(InteractionResponse {
        request_id: "r1".into(),
        reply: Reply::Answer {
            text: "yes, go ahead".into()
        },
    })));
}

#[tokio::test]
async fn test_pending_cleared_by_non_waiting_status() {
    let (mock, handle) = spawn();
    mock.emit(status(ClaudeState::Waiting));
    mock.emit(permission("r1"));
    mock.emit(status(ClaudeState::Running));

    let snap = settle(&handle, |s| s.events_applied == 3).await;
    assert!(snap.pending.is_none());

    mock.emit(status(ClaudeState::Waiting));
    let snap = settle(&handle, |s| s.events_applied == 4).await;
    assert!(snap.pending.is_none());
}

#[tokio::test]
async fn test_approve_sends_permission_and_clears_pending() {
    let (mock, handle) = spawn();
    mock.emit(status(ClaudeState::Waiting));
    mock.emit(permission("r9"));
    settle(&handle, |s| s.pending.is_some()).await;

    handle
        .send(Intent::Approve {
            request_id: "r9".into(),
        })
        .await
        .unwrap();
    settle(&handle, |s| s.pending.is_none()).await;

    wait_calls(&mock, "respond", 1).await;
    assert!(mock.calls().contains(&Call::Respond(InteractionResponse {
        request_id: "r9".into(),
        reply: Reply::Permission { allow: true },
    })));
}

#[tokio::test]
async fn test_failed_prompt_keeps_optimistic_echo() {
    let (mock, handle) = spawn();
    mock.fail("start", MockFailure::Transport("socket closed".into()));

    handle
        .send(Intent::SubmitPrompt("refactor the parser".into()))
        .await
        .unwrap();

    let snap = settle(&handle, |s| s.last_error.is_some()).await;
    assert_eq!(transcript(&snap), vec!["refactor the parser"]);
    assert_eq!(snap.last_error.unwrap().kind, ErrorKind::Transport);
}

#[tokio::test]
async fn test_notifications_for_waiting_and_requests() {
    let (mock, handle) = spawn();
    let mut notifications = handle.notifications();

    mock.emit(status(ClaudeState::Running));
    mock.emit(status(ClaudeState::Waiting));
    mock.emit(permission("r2"));

    assert_eq!(notifications.recv().await.unwrap(), Notification::WaitingEntered);
    assert_eq!(
        notifications.recv().await.unwrap(),
        Notification::InteractionRequested {
            request_id: "r2".into()
        }
    );
}

// ═══════════════════════════════════════════
// Sessions
// ═══════════════════════════════════════════

#[tokio::test]
async fn test_session_identity_change_notifies_once() {
    let (mock, handle) = spawn();
    let mut notifications = handle.notifications();

    mock.emit(session_info("s1"));
    mock.emit(session_info("s1"));
    mock.emit(log("hello", Some("s1")));
    settle(&handle, |s| s.events_applied == 3).await;

    assert_eq!(
        notifications.recv().await.unwrap(),
        Notification::SessionChanged {
            session_id: Some("s1".into())
        }
    );
    assert!(notifications.try_recv().is_err());
}

#[tokio::test]
async fn test_switch_session_replays_history_then_refreshes_diff() {
    let (mock, handle) = spawn();
    mock.add_session(
        summary("s2"),
        vec![
            message("m1", MessageRole::User, "add tests"),
            message("m2", MessageRole::Assistant, "Added 3 tests"),
        ],
    );
    mock.emit(log("old session output", None));
    settle(&handle, |s| s.events_applied == 1).await;

    handle.send(Intent::SwitchSession("s2".into())).await.unwrap();
    let snap = settle(&handle, |s| s.session_id.as_deref() == Some("s2")).await;

    assert_eq!(transcript(&snap), vec!["add tests", "Added 3 tests"]);
    let calls = mock.calls();
    let history_at = calls
        .iter()
        .position(|c| matches!(c, Call::FetchSessionMessages { .. }))
        .unwrap();
    let diff_at = calls
        .iter()
        .position(|c| *c == Call::FetchGitStatus)
        .unwrap();
    assert!(history_at < diff_at);
}

#[tokio::test]
async fn test_failed_history_still_refreshes_diff() {
    let (mock, handle) = spawn();
    mock.add_session(summary("s1"), vec![]);
    mock.set_git_status(vec![DiffEntry::new("src/lib.rs", FileStatus::Modified)]);
    handle.send(Intent::RefreshDiff).await.unwrap();
    settle(&handle, |s| s.diffs.len() == 1).await;

    mock.fail("messages:s1", MockFailure::Transport("connection reset".into()));
    handle.send(Intent::SwitchSession("s1".into())).await.unwrap();

    let snap = settle(&handle, |s| s.last_error.is_some()).await;
    assert_eq!(snap.session_id.as_deref(), Some("s1"));
    assert_eq!(snap.last_error.unwrap().kind, ErrorKind::Transport);
    assert_eq!(snap.diffs.len(), 1);
    assert_eq!(mock.call_count("git_status"), 2);
}

#[tokio::test]
async fn test_reconnect_replays_history_and_merges_live_entries() {
    let (mock, handle) = spawn();
    mock.add_session(
        summary("s1"),
        vec![
            message("m1", MessageRole::User, "run the build"),
            message("m2", MessageRole::Assistant, "Build passed"),
        ],
    );
    connect(&mock, &handle).await;
    mock.emit(session_info("s1"));
    settle(&handle, |s| s.session_id.is_some()).await;

    mock.set_connection(ConnectionState::Disconnected);
    settle(&handle, |s| s.connection == ConnectionState::Disconnected).await;

    let gate = mock.hold("messages:s1");
    mock.set_connection(ConnectionState::Connected);
    wait_calls(&mock, "messages:s1", 1).await;

    // streamed while history is still loading
    mock.emit(log("live line", Some("s1")));
    handle
        .wait_for(WAIT, |s| s.events_applied == 2)
        .await
        .unwrap();
    gate.release();

    let snap = settle(&handle, |s| s.connection == ConnectionState::Connected).await;
    assert_eq!(
        transcript(&snap),
        vec!["run the build", "Build passed", "live line"]
    );
    assert_eq!(mock.call_count("status"), 2);
}

#[tokio::test]
async fn test_missing_session_history_resets_identity_silently() {
    let (mock, handle) = spawn();
    connect(&mock, &handle).await;
    mock.emit(session_info("deleted-elsewhere"));
    settle(&handle, |s| s.session_id.is_some()).await;

    mock.set_connection(ConnectionState::Disconnected);
    settle(&handle, |s| s.connection == ConnectionState::Disconnected).await;
    mock.set_connection(ConnectionState::Connected);

    let snap = settle(&handle, |s| {
        s.connection == ConnectionState::Connected && s.session_id.is_none()
    })
    .await;
    assert!(snap.last_error.is_none());
}

#[tokio::test]
async fn test_delete_current_session_resets_state() {
    let (mock, handle) = spawn();
    mock.add_session(summary("s1"), vec![]);
    mock.add_session(summary("s2"), vec![]);
    mock.emit(session_info("s1"));
    mock.emit(log("output", Some("s1")));

    handle.send(Intent::RefreshSessions).await.unwrap();
    settle(&handle, |s| s.sessions.len() == 2 && s.events_applied == 2).await;

    handle.send(Intent::DeleteSession("s1".into())).await.unwrap();
    let snap = settle(&handle, |s| s.sessions.len() == 1).await;

    assert_eq!(snap.sessions[0].id, "s2");
    assert!(snap.session_id.is_none());
    assert!(snap.logs.is_empty());
}

#[tokio::test]
async fn test_delete_all_sessions() {
    let (mock, handle) = spawn();
    mock.add_session(summary("s1"), vec![]);
    mock.add_session(summary("s2"), vec![]);
    mock.emit(session_info("s2"));

    handle.send(Intent::RefreshSessions).await.unwrap();
    settle(&handle, |s| s.sessions.len() == 2 && s.events_applied == 1).await;

    handle.send(Intent::DeleteAllSessions).await.unwrap();
    let snap = settle(&handle, |s| s.sessions.is_empty()).await;
    assert!(snap.session_id.is_none());
    assert_eq!(mock.call_count("delete_all"), 1);
}

#[tokio::test]
async fn test_new_prompt_after_new_session_uses_new_mode() {
    let (mock, handle) = spawn();
    mock.emit(session_info("s1"));
    settle(&handle, |s| s.session_id.is_some()).await;

    handle.send(Intent::NewSession).await.unwrap();
    handle.send(Intent::SubmitPrompt("start over".into())).await.unwrap();
    wait_calls(&mock, "start", 1).await;

    let start = mock
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Start(request) => Some(request),
            _ => None,
        })
        .unwrap();
    assert_eq!(start.mode, lookout::session::PromptMode::New);
    assert_eq!(start.session_id, None);
}

#[tokio::test]
async fn test_shutdown_stops_loop() {
    let (_mock, handle) = spawn();
    handle.shutdown().await.unwrap();
}
