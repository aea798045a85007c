//! Reconciliation Coordinator - single owner of all client state
//!
//! The coordinator runs as one tokio task. Push events, connection changes,
//! user intents and background completions all arrive on channels and are
//! applied one at a time, so every mutation of the caches, the session state
//! machine and the operation slots is serialized here. Presentation only
//! ever sees immutable [`Snapshot`]s published through a `watch` channel.
//!
//! Background work (REST calls, the search debounce timer) runs in spawned
//! tasks that post a [`Completion`] back to the loop. Completions carry the
//! generation of the [`Ticket`] they were started with and are dropped when
//! that generation is no longer current.

mod handle;
mod history;
mod intent;
mod snapshot;

pub use handle::CoordinatorHandle;
pub use intent::{Intent, Notification};
pub use snapshot::{LoadingFlags, Snapshot};

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::browse::FileBrowser;
use crate::config::{HistoryConfig, LookoutConfig};
use crate::error::{ErrorNotice, LookoutError, Result};
use crate::event::{dispatch, Effect, ServerEvent};
use crate::ops::{OperationSlot, Ticket};
use crate::session::{
    AgentStatus, ConnectionChange, ConnectionState, DiffEntry, LogEntry, Submission,
};
use crate::store::SyncStore;
use crate::transport::{
    AgentTransport, DirEntry, FileContent, InteractionResponse, Reply, SearchHit, SessionSummary,
    StartRequest,
};

const INTENT_CAPACITY: usize = 64;
const NOTIFICATION_CAPACITY: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Completions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
enum DeleteTarget {
    One(String),
    All,
}

/// Result of background work, posted back to the coordinator loop
#[derive(Debug)]
enum Completion {
    Status {
        generation: u64,
        result: Result<AgentStatus>,
    },
    Diff {
        generation: u64,
        result: Result<Vec<DiffEntry>>,
    },
    History {
        generation: u64,
        session_id: String,
        result: Result<Vec<LogEntry>>,
    },
    Sessions {
        generation: u64,
        result: Result<Vec<SessionSummary>>,
    },
    Deleted {
        target: DeleteTarget,
        result: Result<()>,
    },
    Directory {
        generation: u64,
        result: Result<Vec<DirEntry>>,
    },
    File {
        generation: u64,
        result: Result<FileContent>,
    },
    /// Search debounce timer elapsed
    SearchDue {
        debounce: u64,
    },
    Search {
        generation: u64,
        result: Result<Vec<SearchHit>>,
    },
    Command {
        action: &'static str,
        result: Result<()>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Coordinator
// ─────────────────────────────────────────────────────────────────────────────

pub struct Coordinator {
    transport: Arc<dyn AgentTransport>,
    history_config: HistoryConfig,

    store: SyncStore,
    browser: FileBrowser,
    sessions: Vec<SessionSummary>,

    status_op: OperationSlot<()>,
    diff_op: OperationSlot<()>,
    history_op: OperationSlot<String>,
    sessions_op: OperationSlot<()>,

    last_error: Option<ErrorNotice>,
    events_applied: u64,
    revision: u64,

    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
    snapshot_tx: watch::Sender<Snapshot>,
    notify_tx: broadcast::Sender<Notification>,
}

impl Coordinator {
    pub fn new(transport: Arc<dyn AgentTransport>, config: &LookoutConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            transport,
            history_config: config.history.clone(),
            store: SyncStore::new(config.cache.max_log_entries, config.cache.max_diff_entries),
            browser: FileBrowser::new(&config.search),
            sessions: Vec::new(),
            status_op: OperationSlot::new("status"),
            diff_op: OperationSlot::new("diff"),
            history_op: OperationSlot::new("history"),
            sessions_op: OperationSlot::new("sessions"),
            last_error: None,
            events_applied: 0,
            revision: 0,
            completion_tx,
            completion_rx: Some(completion_rx),
            snapshot_tx,
            notify_tx,
        }
    }

    /// Start the coordinator loop on the current runtime
    pub fn spawn(transport: Arc<dyn AgentTransport>, config: &LookoutConfig) -> CoordinatorHandle {
        let coordinator = Self::new(transport, config);
        let (intent_tx, intent_rx) = mpsc::channel(INTENT_CAPACITY);
        let snapshots = coordinator.snapshot_tx.subscribe();
        let notifications = coordinator.notify_tx.clone();

        let task = tokio::spawn(coordinator.run(intent_rx));

        CoordinatorHandle {
            intents: intent_tx,
            snapshots,
            notifications,
            task,
        }
    }

    async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        let mut events = Some(self.transport.events());
        let mut connection = Some(self.transport.connection());
        let Some(mut completions) = self.completion_rx.take() else {
            return;
        };

        info!("coordinator started");
        self.publish();

        loop {
            tokio::select! {
                biased;

                Some(completion) = completions.recv() => self.handle_completion(completion),

                state = next_item(&mut connection) => match state {
                    Some(state) => self.handle_connection(state),
                    None => {
                        debug!("connection stream closed");
                        connection = None;
                    }
                },

                event = next_item(&mut events) => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        debug!("event stream closed");
                        events = None;
                    }
                },

                intent = intents.recv() => match intent {
                    Some(Intent::Shutdown) | None => break,
                    Some(intent) => self.handle_intent(intent),
                },
            }

            self.publish();
        }

        self.cancel_all();
        info!("coordinator stopped");
    }

    // ═══════════════════════════════════════════
    // Inputs
    // ═══════════════════════════════════════════

    fn handle_event(&mut self, event: ServerEvent) {
        self.events_applied += 1;
        let effects = dispatch(&mut self.store, event);
        self.apply_effects(effects);
    }

    fn handle_connection(&mut self, state: ConnectionState) {
        match self.store.session.observe_connection(state) {
            ConnectionChange::Established => {
                info!("connected; resyncing");
                self.fetch_status();
                match self.store.session.session_id().map(String::from) {
                    Some(session_id) => {
                        self.store.clear_transcript();
                        self.replay_history(session_id);
                    }
                    None => self.refresh_diff(),
                }
            }
            ConnectionChange::Lost => warn!(state = %state, "connection lost"),
            ConnectionChange::Other | ConnectionChange::Unchanged => {
                debug!(state = %state, "connection state")
            }
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        debug!(?intent, "intent");
        match intent {
            Intent::SubmitPrompt(text) => self.submit(&text),
            Intent::Approve { request_id } => self.answer_permission(request_id, true),
            Intent::Deny { request_id } => self.answer_permission(request_id, false),
            Intent::Answer { request_id, text } => {
                let session_id = self.store.session.session_id().map(String::from);
                self.store.append_log(LogEntry::user(text.clone(), session_id));
                self.store.session.resolve_pending(&request_id);
                self.respond(request_id, Reply::Answer { text });
            }
            Intent::Stop => self.run_command("stop", |t| async move { t.stop().await }),

            Intent::SwitchSession(session_id) => self.switch_session(session_id),
            Intent::NewSession => self.forget_session(),
            Intent::RefreshSessions => self.refresh_sessions(),
            Intent::DeleteSession(session_id) => self.delete(DeleteTarget::One(session_id)),
            Intent::DeleteAllSessions => self.delete(DeleteTarget::All),
            Intent::RefreshStatus => self.fetch_status(),
            Intent::RefreshDiff => self.refresh_diff(),

            Intent::Navigate(path) => {
                if let Some(ticket) = self.browser.navigate(&path) {
                    self.load_directory(ticket);
                }
            }
            Intent::NavigateBack => {
                if let Some(ticket) = self.browser.go_back() {
                    self.load_directory(ticket);
                }
            }
            Intent::RefreshDirectory => {
                let ticket = self.browser.refresh();
                self.load_directory(ticket);
            }
            Intent::OpenFile(path) => {
                let ticket = self.browser.open_file(&path);
                let transport = self.transport.clone();
                self.spawn_task(async move {
                    let result = ticket.run(transport.read_file(&ticket.key)).await;
                    Completion::File {
                        generation: ticket.generation,
                        result,
                    }
                });
            }
            Intent::CloseFile => self.browser.close_file(),
            Intent::UpdateSearch(query) => {
                self.browser.update_query(&query, &self.completion_tx, |debounce| {
                    Completion::SearchDue { debounce }
                });
            }
            Intent::SwitchWorkspace => {
                info!("workspace switched; resetting browser");
                let ticket = self.browser.reset();
                self.load_directory(ticket);
            }
            Intent::ClearError => {
                self.last_error = None;
                self.browser.clear_error();
            }
            Intent::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Status { generation, result } => {
                if !self.status_op.complete(generation) {
                    return;
                }
                match result {
                    Ok(status) => {
                        let effects = dispatch(&mut self.store, ServerEvent::StatusResponse(status));
                        self.apply_effects(effects);
                    }
                    Err(e) => self.surface(e),
                }
            }
            Completion::Diff { generation, result } => {
                if !self.diff_op.complete(generation) {
                    return;
                }
                match result {
                    Ok(entries) => {
                        debug!(count = entries.len(), "diff refreshed");
                        self.store.replace_diffs(entries);
                        self.browser.enrich(&self.store.git_status_map());
                    }
                    Err(e) => self.surface(e),
                }
            }
            Completion::History {
                generation,
                session_id,
                result,
            } => {
                if !self.history_op.complete(generation) {
                    return;
                }
                match result {
                    Ok(entries) => {
                        info!(session = %session_id, count = entries.len(), "history replayed");
                        self.store.merge_history(entries);
                        self.refresh_diff();
                    }
                    Err(e) if e.is_not_found() => {
                        info!(session = %session_id, "session no longer exists; clearing identity");
                        if self.store.session.session_id() == Some(session_id.as_str()) {
                            self.reset_identity();
                        }
                        self.refresh_diff();
                    }
                    Err(e) => {
                        self.surface(e);
                        self.refresh_diff();
                    }
                }
            }
            Completion::Sessions { generation, result } => {
                if !self.sessions_op.complete(generation) {
                    return;
                }
                match result {
                    Ok(sessions) => self.sessions = sessions,
                    Err(e) => self.surface(e),
                }
            }
            Completion::Deleted { target, result } => match result {
                Ok(()) => self.apply_delete(target),
                Err(e) if e.is_not_found() => {
                    debug!(?target, "session already gone");
                    self.apply_delete(target);
                }
                Err(e) => self.surface(e),
            },
            Completion::Directory { generation, result } => {
                let git_status = self.store.git_status_map();
                if let Some(notice) = self.browser.apply_directory(generation, result, &git_status) {
                    self.raise(notice);
                }
            }
            Completion::File { generation, result } => {
                if let Some(notice) = self.browser.apply_file(generation, result) {
                    self.raise(notice);
                }
            }
            Completion::SearchDue { debounce } => {
                if let Some(ticket) = self.browser.start_search(debounce) {
                    let transport = self.transport.clone();
                    self.spawn_task(async move {
                        let result = ticket.run(transport.search_files(&ticket.key)).await;
                        Completion::Search {
                            generation: ticket.generation,
                            result,
                        }
                    });
                }
            }
            Completion::Search { generation, result } => {
                if let Some(notice) = self.browser.apply_search(generation, result) {
                    self.raise(notice);
                }
            }
            Completion::Command { action, result } => match result {
                Ok(()) => debug!(action, "command accepted"),
                Err(e) => self.surface(e),
            },
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::RefreshDiff => self.refresh_diff(),
                Effect::SessionChanged { session_id } => {
                    info!(session = ?session_id, "session identity changed");
                    self.notify(Notification::SessionChanged { session_id });
                }
                Effect::WaitingEntered => self.notify(Notification::WaitingEntered),
                Effect::InteractionRequested { request_id } => {
                    self.notify(Notification::InteractionRequested { request_id })
                }
                Effect::Error(notice) => self.raise(notice),
            }
        }
    }

    // ═══════════════════════════════════════════
    // Agent control
    // ═══════════════════════════════════════════

    /// Echo the input locally, then route it as an answer or a prompt.
    ///
    /// The echo stays in the transcript even if the request fails.
    fn submit(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let session_id = self.store.session.session_id().map(String::from);
        self.store.append_log(LogEntry::user(text, session_id));

        match self.store.session.route_submission(text) {
            Submission::Respond { request_id, text } => {
                self.respond(request_id, Reply::Answer { text });
            }
            Submission::Prompt {
                text,
                mode,
                session_id,
            } => {
                let request = StartRequest {
                    prompt: text,
                    mode,
                    session_id,
                };
                self.run_command("start", |t| async move { t.start(request).await });
            }
        }
    }

    fn answer_permission(&mut self, request_id: String, allow: bool) {
        self.store.session.resolve_pending(&request_id);
        self.respond(request_id, Reply::Permission { allow });
    }

    fn respond(&mut self, request_id: String, reply: Reply) {
        let response = InteractionResponse { request_id, reply };
        self.run_command("respond", |t| async move { t.respond(response).await });
    }

    fn run_command<F, Fut>(&self, action: &'static str, call: F)
    where
        F: FnOnce(Arc<dyn AgentTransport>) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let request = call(self.transport.clone());
        self.spawn_task(async move {
            Completion::Command {
                action,
                result: request.await,
            }
        });
    }

    // ═══════════════════════════════════════════
    // Sessions
    // ═══════════════════════════════════════════

    fn switch_session(&mut self, session_id: String) {
        if session_id.is_empty() {
            self.forget_session();
            return;
        }
        if self.store.session.session_id() == Some(session_id.as_str()) {
            debug!(session = %session_id, "already on session");
            return;
        }

        info!(session = %session_id, "switching session");
        self.store.session.set_session_id(&session_id);
        self.store.clear_transcript();
        self.notify(Notification::SessionChanged {
            session_id: Some(session_id.clone()),
        });
        self.replay_history(session_id);
    }

    fn replay_history(&mut self, session_id: String) {
        let ticket = self.history_op.begin(session_id);
        let transport = self.transport.clone();
        let config = self.history_config.clone();
        self.spawn_task(async move {
            let result = ticket
                .run(history::fetch_history(transport.as_ref(), &ticket.key, &config))
                .await;
            Completion::History {
                generation: ticket.generation,
                session_id: ticket.key.clone(),
                result,
            }
        });
    }

    /// Drop the session identity and its transcript
    fn forget_session(&mut self) {
        self.history_op.reset();
        self.store.clear_transcript();
        self.reset_identity();
    }

    fn reset_identity(&mut self) {
        if self.store.session.set_session_id("") {
            self.notify(Notification::SessionChanged { session_id: None });
        }
    }

    fn refresh_sessions(&mut self) {
        let ticket = self.sessions_op.begin(());
        let transport = self.transport.clone();
        self.spawn_task(async move {
            let result = ticket.run(transport.list_sessions()).await;
            Completion::Sessions {
                generation: ticket.generation,
                result,
            }
        });
    }

    fn delete(&mut self, target: DeleteTarget) {
        let transport = self.transport.clone();
        self.spawn_task(async move {
            let result = match &target {
                DeleteTarget::One(id) => transport.delete_session(id).await,
                DeleteTarget::All => transport.delete_all_sessions().await,
            };
            Completion::Deleted { target, result }
        });
    }

    fn apply_delete(&mut self, target: DeleteTarget) {
        let current_deleted = match &target {
            DeleteTarget::One(id) => {
                self.sessions.retain(|s| s.id != *id);
                self.store.session.session_id() == Some(id.as_str())
            }
            DeleteTarget::All => {
                self.sessions.clear();
                self.store.session.session_id().is_some()
            }
        };
        if current_deleted {
            info!("current session deleted");
            self.forget_session();
        }
    }

    // ═══════════════════════════════════════════
    // Status and diff
    // ═══════════════════════════════════════════

    fn fetch_status(&mut self) {
        let ticket = self.status_op.begin(());
        let transport = self.transport.clone();
        self.spawn_task(async move {
            let result = ticket.run(transport.fetch_status()).await;
            Completion::Status {
                generation: ticket.generation,
                result,
            }
        });
    }

    /// Pull git status; a newer refresh supersedes one in flight
    fn refresh_diff(&mut self) {
        let ticket = self.diff_op.begin(());
        let transport = self.transport.clone();
        self.spawn_task(async move {
            let result = ticket.run(transport.fetch_git_status()).await;
            Completion::Diff {
                generation: ticket.generation,
                result,
            }
        });
    }

    fn load_directory(&self, ticket: Ticket<String>) {
        let transport = self.transport.clone();
        self.spawn_task(async move {
            let result = ticket.run(transport.list_directory(&ticket.key)).await;
            Completion::Directory {
                generation: ticket.generation,
                result,
            }
        });
    }

    // ═══════════════════════════════════════════
    // Output
    // ═══════════════════════════════════════════

    fn cancel_all(&mut self) {
        self.status_op.cancel();
        self.diff_op.cancel();
        self.history_op.cancel();
        self.sessions_op.cancel();
        self.browser.cancel_all();
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    /// Record an error as the current one; cancellation stays silent
    fn surface(&mut self, error: LookoutError) {
        if let Some(notice) = error.notice() {
            self.raise(notice);
        }
    }

    fn raise(&mut self, notice: ErrorNotice) {
        warn!(kind = %notice.kind, "{}", notice.message);
        self.last_error = Some(notice.clone());
        self.notify(Notification::ErrorRaised(notice));
    }

    fn notify(&self, notification: Notification) {
        // no subscribers is fine
        let _ = self.notify_tx.send(notification);
    }

    fn publish(&mut self) {
        self.revision += 1;
        let snapshot = self.snapshot();
        self.snapshot_tx.send_replace(snapshot);
    }

    pub fn snapshot(&self) -> Snapshot {
        let browser = self.browser.snapshot();
        let session = &self.store.session;
        Snapshot {
            revision: self.revision,
            events_applied: self.events_applied,
            connection: session.connection(),
            status: session.status().clone(),
            claude_state: session.claude_state(),
            session_id: session.session_id().map(String::from),
            pending: session.pending().cloned(),
            logs: self.store.logs().get_all(),
            diffs: self.store.diffs().get_all(),
            sessions: self.sessions.clone(),
            loading: LoadingFlags {
                status: self.status_op.in_flight(),
                history: self.history_op.in_flight(),
                diff: self.diff_op.in_flight(),
                sessions: self.sessions_op.in_flight(),
                directory: browser.loading_directory,
                file: browser.loading_file,
                search: browser.searching,
            },
            browser,
            last_error: self.last_error.clone(),
        }
    }
}

async fn next_item<S>(stream: &mut Option<S>) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    match stream.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}
