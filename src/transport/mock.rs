//! Mock Transport - For testing and offline replay
//!
//! Serves canned responses from in-memory tables, records every call, and
//! lets tests hold individual requests behind a [`Gate`] to control the
//! order in which responses arrive.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::Stream;

use super::{
    AgentTransport, DirEntry, FileContent, InteractionResponse, MessagePage, PageRequest,
    SearchHit, SessionSummary, StartRequest,
};
use crate::error::{LookoutError, Result};
use crate::event::ServerEvent;
use crate::session::{AgentStatus, ConnectionState, DiffEntry};
use crate::transport::HistoryMessage;

// ─────────────────────────────────────────────────────────────────────────────
// Recorded calls
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchStatus,
    FetchGitStatus,
    ListSessions,
    FetchSessionMessages {
        session_id: String,
        offset: usize,
        limit: usize,
    },
    DeleteSession(String),
    DeleteAllSessions,
    ListDirectory(String),
    ReadFile(String),
    SearchFiles(String),
    Start(StartRequest),
    Stop,
    Respond(InteractionResponse),
}

impl Call {
    /// Key used for gates and injected failures, e.g. `dir:src` or `start`
    pub fn key(&self) -> String {
        match self {
            Call::FetchStatus => "status".to_string(),
            Call::FetchGitStatus => "git_status".to_string(),
            Call::ListSessions => "sessions".to_string(),
            Call::FetchSessionMessages { session_id, .. } => format!("messages:{}", session_id),
            Call::DeleteSession(id) => format!("delete:{}", id),
            Call::DeleteAllSessions => "delete_all".to_string(),
            Call::ListDirectory(path) => format!("dir:{}", path),
            Call::ReadFile(path) => format!("file:{}", path),
            Call::SearchFiles(query) => format!("search:{}", query),
            Call::Start(_) => "start".to_string(),
            Call::Stop => "stop".to_string(),
            Call::Respond(_) => "respond".to_string(),
        }
    }
}

/// Failure injected for a call key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockFailure {
    Transport(String),
    NotFound,
    Command(String),
}

impl MockFailure {
    fn to_error(&self, key: &str) -> LookoutError {
        match self {
            MockFailure::Transport(message) => LookoutError::transport(message.clone()),
            MockFailure::NotFound => LookoutError::not_found(key),
            MockFailure::Command(message) => LookoutError::Command {
                message: message.clone(),
            },
        }
    }
}

/// Holds the next call with a given key until released
#[derive(Debug, Clone)]
pub struct Gate(Arc<Notify>);

impl Gate {
    pub fn release(&self) {
        self.0.notify_one();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock Transport
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MockState {
    status: AgentStatus,
    git_status: Vec<DiffEntry>,
    sessions: Vec<SessionSummary>,
    histories: HashMap<String, Vec<HistoryMessage>>,
    directories: HashMap<String, Vec<DirEntry>>,
    files: HashMap<String, FileContent>,
    search_results: HashMap<String, Vec<SearchHit>>,
    failures: HashMap<String, MockFailure>,
    gates: HashMap<String, Arc<Notify>>,
}

type Receiver<T> = Mutex<Option<mpsc::UnboundedReceiver<T>>>;

/// In-memory agent server
pub struct MockTransport {
    event_tx: mpsc::UnboundedSender<ServerEvent>,
    event_rx: Receiver<ServerEvent>,
    connection_tx: mpsc::UnboundedSender<ConnectionState>,
    connection_rx: Receiver<ConnectionState>,
    state: Mutex<MockState>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (connection_tx, connection_rx) = mpsc::unbounded_channel();
        Self {
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
            connection_tx,
            connection_rx: Mutex::new(Some(connection_rx)),
            state: Mutex::new(MockState::default()),
            calls: Mutex::new(Vec::new()),
        }
    }

    // ═══════════════════════════════════════════
    // Push side
    // ═══════════════════════════════════════════

    pub fn emit(&self, event: ServerEvent) {
        let _ = self.event_tx.send(event);
    }

    pub fn set_connection(&self, state: ConnectionState) {
        let _ = self.connection_tx.send(state);
    }

    // ═══════════════════════════════════════════
    // Canned responses
    // ═══════════════════════════════════════════

    pub fn set_status(&self, status: AgentStatus) {
        self.state.lock().status = status;
    }

    pub fn set_git_status(&self, entries: Vec<DiffEntry>) {
        self.state.lock().git_status = entries;
    }

    /// Register a session with its full message history
    pub fn add_session(&self, summary: SessionSummary, messages: Vec<HistoryMessage>) {
        let mut state = self.state.lock();
        state.histories.insert(summary.id.clone(), messages);
        state.sessions.push(summary);
    }

    /// Replace a session's history, registering the session if unknown
    pub fn set_history(&self, session_id: &str, messages: Vec<HistoryMessage>) {
        let mut state = self.state.lock();
        if !state.sessions.iter().any(|s| s.id == session_id) {
            state.sessions.push(SessionSummary {
                id: session_id.to_string(),
                title: None,
                updated_at: None,
                message_count: 0,
            });
        }
        if let Some(summary) = state.sessions.iter_mut().find(|s| s.id == session_id) {
            summary.message_count = messages.len() as u32;
        }
        state.histories.insert(session_id.to_string(), messages);
    }

    pub fn set_directory(&self, path: &str, entries: Vec<DirEntry>) {
        self.state.lock().directories.insert(path.to_string(), entries);
    }

    pub fn set_file(&self, path: &str, content: &str) {
        self.state.lock().files.insert(
            path.to_string(),
            FileContent {
                path: path.to_string(),
                content: content.to_string(),
                language: None,
                truncated: false,
            },
        );
    }

    pub fn set_search_results(&self, query: &str, hits: Vec<SearchHit>) {
        self.state
            .lock()
            .search_results
            .insert(query.to_string(), hits);
    }

    /// Make every call with `key` fail until cleared
    pub fn fail(&self, key: &str, failure: MockFailure) {
        self.state.lock().failures.insert(key.to_string(), failure);
    }

    pub fn clear_failure(&self, key: &str) {
        self.state.lock().failures.remove(key);
    }

    /// Hold the next call with `key` until the returned gate is released
    pub fn hold(&self, key: &str) -> Gate {
        let notify = Arc::new(Notify::new());
        self.state
            .lock()
            .gates
            .insert(key.to_string(), notify.clone());
        Gate(notify)
    }

    // ═══════════════════════════════════════════
    // Call log
    // ═══════════════════════════════════════════

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Number of recorded calls with the given key
    pub fn call_count(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.key() == key).count()
    }

    async fn enter(&self, call: Call) -> Result<()> {
        let key = call.key();
        self.calls.lock().push(call);

        let gate = self.state.lock().gates.remove(&key);
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let failure = self.state.lock().failures.get(&key).cloned();
        match failure {
            Some(failure) => Err(failure.to_error(&key)),
            None => Ok(()),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn take_stream<T: Send + 'static>(
    slot: &Receiver<T>,
) -> Box<dyn Stream<Item = T> + Send + Unpin> {
    match slot.lock().take() {
        Some(rx) => Box::new(UnboundedReceiverStream::new(rx)),
        None => Box::new(tokio_stream::empty()),
    }
}

#[async_trait]
impl AgentTransport for MockTransport {
    fn events(&self) -> Box<dyn Stream<Item = ServerEvent> + Send + Unpin> {
        take_stream(&self.event_rx)
    }

    fn connection(&self) -> Box<dyn Stream<Item = ConnectionState> + Send + Unpin> {
        take_stream(&self.connection_rx)
    }

    async fn fetch_status(&self) -> Result<AgentStatus> {
        self.enter(Call::FetchStatus).await?;
        Ok(self.state.lock().status.clone())
    }

    async fn fetch_git_status(&self) -> Result<Vec<DiffEntry>> {
        self.enter(Call::FetchGitStatus).await?;
        Ok(self.state.lock().git_status.clone())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.enter(Call::ListSessions).await?;
        Ok(self.state.lock().sessions.clone())
    }

    async fn fetch_session_messages(
        &self,
        session_id: &str,
        page: PageRequest,
    ) -> Result<MessagePage> {
        self.enter(Call::FetchSessionMessages {
            session_id: session_id.to_string(),
            offset: page.offset,
            limit: page.limit,
        })
        .await?;

        let state = self.state.lock();
        let history = state
            .histories
            .get(session_id)
            .ok_or_else(|| LookoutError::not_found(format!("session {}", session_id)))?;

        let end = (page.offset + page.limit).min(history.len());
        let start = page.offset.min(end);
        Ok(MessagePage {
            messages: history[start..end].to_vec(),
            has_more: end < history.len(),
        })
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.enter(Call::DeleteSession(session_id.to_string()))
            .await?;

        let mut state = self.state.lock();
        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != session_id);
        state.histories.remove(session_id);
        if state.sessions.len() == before {
            return Err(LookoutError::not_found(format!("session {}", session_id)));
        }
        Ok(())
    }

    async fn delete_all_sessions(&self) -> Result<()> {
        self.enter(Call::DeleteAllSessions).await?;
        let mut state = self.state.lock();
        state.sessions.clear();
        state.histories.clear();
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>> {
        self.enter(Call::ListDirectory(path.to_string())).await?;
        self.state
            .lock()
            .directories
            .get(path)
            .cloned()
            .ok_or_else(|| LookoutError::not_found(format!("directory '{}'", path)))
    }

    async fn read_file(&self, path: &str) -> Result<FileContent> {
        self.enter(Call::ReadFile(path.to_string())).await?;
        self.state
            .lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| LookoutError::not_found(format!("file '{}'", path)))
    }

    async fn search_files(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.enter(Call::SearchFiles(query.to_string())).await?;
        Ok(self
            .state
            .lock()
            .search_results
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn start(&self, request: StartRequest) -> Result<()> {
        self.enter(Call::Start(request)).await
    }

    async fn stop(&self) -> Result<()> {
        self.enter(Call::Stop).await
    }

    async fn respond(&self, response: InteractionResponse) -> Result<()> {
        self.enter(Call::Respond(response)).await
    }
}
