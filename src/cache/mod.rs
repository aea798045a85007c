//! Bounded caches for streamed data
//!
//! The coordinator keeps two instances: log lines keyed by entry id and
//! diff entries keyed by file path.

mod bounded;

pub use bounded::{BoundedCache, CacheEntry};
