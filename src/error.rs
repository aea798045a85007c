//! Error types with fix suggestions
//!
//! Error code ranges:
//! - LOOKOUT-000-009: Transport/connectivity errors
//! - LOOKOUT-010-019: Not-found errors
//! - LOOKOUT-020-029: Cancellation
//! - LOOKOUT-030-039: Agent command failures
//! - LOOKOUT-040-049: Decoding errors
//! - LOOKOUT-050-059: Configuration errors
//! - LOOKOUT-090-099: IO / wrapped errors

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LookoutError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum LookoutError {
    // ─────────────────────────────────────────────────────────────
    // Transport (000-009)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-001] Transport error: {message}")]
    Transport { message: String },

    #[error("[LOOKOUT-002] Request '{operation}' timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("[LOOKOUT-003] Not connected to agent server")]
    Disconnected,

    // ─────────────────────────────────────────────────────────────
    // Not found (010-019)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-010] Not found: {resource}")]
    NotFound { resource: String },

    // ─────────────────────────────────────────────────────────────
    // Cancellation (020-029)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-020] Operation cancelled")]
    Cancelled,

    // ─────────────────────────────────────────────────────────────
    // Agent command failures (030-039)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-030] Agent reported an error: {message}")]
    Command { message: String },

    // ─────────────────────────────────────────────────────────────
    // Decoding (040-049)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-040] Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("[LOOKOUT-041] Invalid recording at line {line}: {reason}")]
    Recording { line: usize, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Configuration (050-059)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-050] Configuration error: {reason}")]
    Config { reason: String },

    // ─────────────────────────────────────────────────────────────
    // IO / wrapped (090-099)
    // ─────────────────────────────────────────────────────────────
    #[error("[LOOKOUT-090] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[LOOKOUT-099] {0}")]
    Other(String),
}

/// Coarse error taxonomy used for propagation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    NotFound,
    Cancelled,
    Command,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::NotFound => write!(f, "not-found"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Command => write!(f, "command"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl LookoutError {
    /// Shorthand for a transport failure
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Shorthand for a missing resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } | Self::Disconnected => {
                ErrorKind::Transport
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Command { .. } => ErrorKind::Command,
            Self::Decode(_)
            | Self::Recording { .. }
            | Self::Config { .. }
            | Self::Io(_)
            | Self::Other(_) => ErrorKind::Unknown,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Convert into the value surfaced to presentation.
    ///
    /// Returns `None` for cancellation, which is never user-visible.
    pub fn notice(&self) -> Option<ErrorNotice> {
        if self.is_cancelled() {
            return None;
        }
        Some(ErrorNotice {
            kind: self.kind(),
            message: self.to_string(),
        })
    }
}

impl FixSuggestion for LookoutError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            LookoutError::Transport { .. } => Some("Check the server URL and network connectivity"),
            LookoutError::Timeout { .. } => Some("The server is slow to respond; retry the action"),
            LookoutError::Disconnected => Some("Wait for the connection to be re-established"),
            LookoutError::NotFound { .. } => Some("Refresh the session list; the item may have been deleted"),
            LookoutError::Cancelled => None,
            LookoutError::Command { .. } => Some("Inspect the agent log for the failing command"),
            LookoutError::Decode(_) => Some("Check that the payload is valid JSON"),
            LookoutError::Recording { .. } => {
                Some("Each line must be a {\"type\", \"payload\"} event or {\"connection\": ...}")
            }
            LookoutError::Config { .. } => Some("Check ~/.config/lookout/config.toml syntax"),
            LookoutError::Io(_) => Some("Check file path and permissions"),
            LookoutError::Other(_) => None,
        }
    }
}

/// A user-visible error captured in snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorNotice {
    /// Notice for an error message reported by the agent itself
    pub fn command(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Command,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}
