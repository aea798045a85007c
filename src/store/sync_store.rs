//! SyncStore - session state plus the two bounded caches

use std::collections::HashMap;

use crate::cache::BoundedCache;
use crate::session::{DiffEntry, FileStatus, LogEntry, SessionState};

#[derive(Debug, Clone)]
pub struct SyncStore {
    pub session: SessionState,
    logs: BoundedCache<LogEntry>,
    diffs: BoundedCache<DiffEntry>,
}

impl SyncStore {
    pub fn new(max_log_entries: usize, max_diff_entries: usize) -> Self {
        Self {
            session: SessionState::new(),
            logs: BoundedCache::new(max_log_entries),
            diffs: BoundedCache::new(max_diff_entries),
        }
    }

    pub fn logs(&self) -> &BoundedCache<LogEntry> {
        &self.logs
    }

    pub fn diffs(&self) -> &BoundedCache<DiffEntry> {
        &self.diffs
    }

    pub fn append_log(&mut self, entry: LogEntry) {
        self.logs.add(entry);
    }

    pub fn upsert_diff(&mut self, entry: DiffEntry) {
        self.diffs.add(entry);
    }

    pub fn remove_diff(&mut self, path: &str) {
        self.diffs.remove(&path.to_string());
    }

    /// Full refresh: the fetched set replaces the cache contents
    pub fn replace_diffs(&mut self, entries: Vec<DiffEntry>) {
        self.diffs.clear();
        for entry in entries {
            self.diffs.add(entry);
        }
    }

    /// Drop the transcript and diff state (session switch / reconnect)
    pub fn clear_transcript(&mut self) {
        self.logs.clear();
        self.diffs.clear();
    }

    /// Merge fetched history with entries streamed in while it was loading.
    ///
    /// History goes first (oldest to newest), live entries follow in their
    /// arrival order. A live entry whose id already appears in history keeps
    /// the history slot.
    pub fn merge_history(&mut self, history: Vec<LogEntry>) {
        let live = self.logs.oldest_first();
        self.logs.clear();
        for entry in history {
            self.logs.add(entry);
        }
        for entry in live {
            if !self.logs.contains(&entry.id) {
                self.logs.add(entry);
            }
        }
    }

    /// Path → status view of the diff cache, used for browser enrichment
    pub fn git_status_map(&self) -> HashMap<String, FileStatus> {
        self.diffs
            .oldest_first()
            .into_iter()
            .map(|d| (d.path, d.status))
            .collect()
    }
}
