//! Event Module - push stream envelope and dispatch
//!
//! Key types:
//! - `ServerEvent`: discriminated union of inbound events (`type` + `payload`)
//! - `dispatch`: applies one event to the `SyncStore`, returning `Effect`s

mod dispatch;
mod envelope;

pub use dispatch::{dispatch, Effect};
pub use envelope::{
    ChangeType, ErrorPayload, FileChangedPayload, InteractionPayload, LogPayload,
    ServerEvent, SessionInfoPayload, StatusUpdate,
};
