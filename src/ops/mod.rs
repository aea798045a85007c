//! Cancellable operation control
//!
//! Key types:
//! - `OperationSlot`: generation-token controller, one per operation class
//! - `Ticket`: handle given to the background work of one operation
//! - `Debouncer`: cancellable delayed start (search input)

mod debounce;
mod slot;

pub use debounce::Debouncer;
pub use slot::{OperationSlot, Ticket};
