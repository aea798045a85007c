//! Lookout - sync and caching engine for a remote coding-agent session
//!
//! ## Architecture
//!
//! ```text
//!   AgentTransport ──events──┐
//!        │      └─connection─┤
//!        │                   ▼
//!        │          ┌──────────────────┐   watch    ┌──────────────┐
//!        │          │   Coordinator    │──────────▶ │   Snapshot   │
//!        │          │  (single writer) │            └──────────────┘
//!        │          │                  │  broadcast ┌──────────────┐
//!        │          │  SyncStore       │──────────▶ │ Notification │
//!        │          │  FileBrowser     │            └──────────────┘
//!        │          │  OperationSlots  │◀── Intent (mpsc)
//!        │          └────────┬─────────┘
//!        │                   │ spawn + Ticket
//!        └───── REST pulls ◀─┘   Completion (generation-checked)
//! ```
//!
//! - `cache`: bounded FIFO-evicting keyed store
//! - `session`: data model and the agent state machine
//! - `event`: push-event envelope and dispatch
//! - `ops`: cancellable operation slots and the search debouncer
//! - `browse`: workspace navigation, file viewing and search
//! - `transport`: the agent server seam and an in-memory mock
//! - `coordinator`: the actor owning all of the above
//! - `replay`: feeds recorded event streams through a coordinator

pub mod browse;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod ops;
pub mod replay;
pub mod session;
pub mod store;
pub mod transport;

pub use browse::{BrowserSnapshot, FileBrowser};
pub use cache::{BoundedCache, CacheEntry};
pub use config::LookoutConfig;
pub use coordinator::{Coordinator, CoordinatorHandle, Intent, LoadingFlags, Notification, Snapshot};
pub use error::{ErrorKind, ErrorNotice, FixSuggestion, LookoutError, Result};
pub use event::{dispatch, Effect, ServerEvent};
pub use ops::{Debouncer, OperationSlot, Ticket};
pub use session::{
    AgentStatus, ClaudeState, ConnectionState, DiffEntry, FileStatus, LogEntry,
    PendingInteraction, SessionState,
};
pub use store::SyncStore;
pub use transport::{AgentTransport, MockTransport};
