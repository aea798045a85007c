//! SessionState - agent/session state machine
//!
//! Tracks connection lifecycle, the authoritative `AgentStatus`, the current
//! session identity and at most one `PendingInteraction`. Claude state
//! transitions are never inferred locally; they only come from status
//! updates handed to [`SessionState::apply_status`].

use super::types::{AgentStatus, ClaudeState, ConnectionState, PendingInteraction};

/// Result of applying a status update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: ClaudeState,
    pub to: ClaudeState,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }

    /// Entry into `waiting` from any other state
    pub fn entered_waiting(&self) -> bool {
        self.to == ClaudeState::Waiting && self.from != ClaudeState::Waiting
    }

    /// `running -> idle | stopped`: agent actions may have changed files
    pub fn finished_run(&self) -> bool {
        self.from == ClaudeState::Running
            && matches!(self.to, ClaudeState::Idle | ClaudeState::Stopped)
    }
}

/// Outcome of observing a connection state value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionChange {
    Unchanged,
    /// `disconnected | connecting -> connected`
    Established,
    /// `connected -> disconnected | connecting`
    Lost,
    Other,
}

/// How a new prompt is executed by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptMode {
    New,
    Continue,
}

/// Where user input goes, decided by [`SessionState::route_submission`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Answer to the pending interaction with this request id
    Respond { request_id: String, text: String },
    /// Fresh prompt
    Prompt {
        text: String,
        mode: PromptMode,
        session_id: Option<String>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    connection: ConnectionState,
    status: AgentStatus,
    session_id: String,
    pending: Option<PendingInteraction>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn status(&self) -> &AgentStatus {
        &self.status
    }

    pub fn claude_state(&self) -> ClaudeState {
        self.status.claude_state
    }

    /// Current session id, `None` when unknown
    pub fn session_id(&self) -> Option<&str> {
        if self.session_id.is_empty() {
            None
        } else {
            Some(&self.session_id)
        }
    }

    pub fn pending(&self) -> Option<&PendingInteraction> {
        self.pending.as_ref()
    }

    /// Set the session identity; returns `true` only when the value changed
    pub fn set_session_id(&mut self, id: &str) -> bool {
        if self.session_id == id {
            return false;
        }
        self.session_id = id.to_string();
        true
    }

    /// Replace the status wholesale and report the claude state transition.
    ///
    /// Any state other than `waiting` clears the pending interaction.
    pub fn apply_status(&mut self, next: AgentStatus) -> Transition {
        let transition = Transition {
            from: self.status.claude_state,
            to: next.claude_state,
        };
        if next.claude_state != ClaudeState::Waiting {
            self.pending = None;
        }
        self.status = next;
        transition
    }

    /// Install a new pending interaction, returning the one it replaced
    pub fn set_pending(&mut self, interaction: PendingInteraction) -> Option<PendingInteraction> {
        self.pending.replace(interaction)
    }

    /// Clear the pending interaction if it matches `request_id`
    pub fn resolve_pending(&mut self, request_id: &str) -> Option<PendingInteraction> {
        if self
            .pending
            .as_ref()
            .is_some_and(|p| p.request_id == request_id)
        {
            return self.pending.take();
        }
        None
    }

    /// Decide how user input is routed.
    ///
    /// While `waiting` with a pending interaction, the input answers it and
    /// the interaction is cleared immediately. Otherwise it becomes a prompt,
    /// continuing the current session when one is known.
    pub fn route_submission(&mut self, text: &str) -> Submission {
        if self.claude_state() == ClaudeState::Waiting {
            if let Some(pending) = self.pending.take() {
                return Submission::Respond {
                    request_id: pending.request_id,
                    text: text.to_string(),
                };
            }
        }

        match self.session_id() {
            Some(id) => Submission::Prompt {
                text: text.to_string(),
                mode: PromptMode::Continue,
                session_id: Some(id.to_string()),
            },
            None => Submission::Prompt {
                text: text.to_string(),
                mode: PromptMode::New,
                session_id: None,
            },
        }
    }

    pub fn observe_connection(&mut self, next: ConnectionState) -> ConnectionChange {
        let prev = std::mem::replace(&mut self.connection, next);
        match (prev, next) {
            (a, b) if a == b => ConnectionChange::Unchanged,
            (_, ConnectionState::Connected) => ConnectionChange::Established,
            (ConnectionState::Connected, _) => ConnectionChange::Lost,
            _ => ConnectionChange::Other,
        }
    }
}
