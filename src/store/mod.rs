//! Store Module - coordinator-owned state
//!
//! Key types:
//! - `SyncStore`: session state machine plus the log and diff caches
//!
//! The store has exactly one owner (the coordinator task). Presentation
//! only ever sees cloned snapshots of it.

mod sync_store;

pub use sync_store::SyncStore;
