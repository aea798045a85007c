//! Imperative intents accepted from presentation, and notifications sent back

use crate::error::ErrorNotice;

/// Something the user asked for; processed asynchronously by the coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    // Agent control
    /// Free-text input; answers the pending interaction while waiting,
    /// otherwise starts or continues a run
    SubmitPrompt(String),
    Approve { request_id: String },
    Deny { request_id: String },
    Answer { request_id: String, text: String },
    Stop,

    // Sessions
    SwitchSession(String),
    /// Forget the current session so the next prompt starts fresh
    NewSession,
    RefreshSessions,
    DeleteSession(String),
    DeleteAllSessions,
    RefreshStatus,
    RefreshDiff,

    // Workspace browser
    Navigate(String),
    NavigateBack,
    RefreshDirectory,
    OpenFile(String),
    CloseFile,
    UpdateSearch(String),
    /// Cancel everything in the browser and reload from the root
    SwitchWorkspace,

    ClearError,
    Shutdown,
}

/// One-shot signals for alerts and haptics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Agent entered `waiting`
    WaitingEntered,
    InteractionRequested { request_id: String },
    SessionChanged { session_id: Option<String> },
    ErrorRaised(ErrorNotice),
}
