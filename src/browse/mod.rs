//! File Browser - workspace navigation, file viewing and search
//!
//! Owns one [`OperationSlot`] per operation class (directory listing, file
//! open, search) plus the search [`Debouncer`]. Methods that start work
//! return a [`Ticket`]; the coordinator runs the request in the background
//! and feeds the result back through the matching `apply_*` method, which
//! drops anything that is no longer current.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::config::SearchConfig;
use crate::error::{ErrorNotice, Result};
use crate::ops::{Debouncer, OperationSlot, Ticket};
use crate::session::FileStatus;
use crate::transport::{DirEntry, FileContent, SearchHit};

/// Path of the workspace root
pub const ROOT: &str = "";

/// What presentation sees of the browser
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserSnapshot {
    pub current_path: String,
    pub entries: Vec<DirEntry>,
    pub can_go_back: bool,
    pub open_file: Option<FileContent>,
    pub search_query: String,
    pub search_results: Vec<SearchHit>,
    pub loading_directory: bool,
    pub loading_file: bool,
    pub searching: bool,
    pub error: Option<ErrorNotice>,
}

#[derive(Debug)]
pub struct FileBrowser {
    directory: OperationSlot<String>,
    file: OperationSlot<String>,
    search: OperationSlot<String>,
    debounce: Debouncer,
    min_query_len: usize,

    back_stack: Vec<String>,
    entries: Vec<DirEntry>,
    open_file: Option<FileContent>,
    query: String,
    results: Vec<SearchHit>,
    error: Option<ErrorNotice>,
}

impl FileBrowser {
    pub fn new(search: &SearchConfig) -> Self {
        Self {
            directory: OperationSlot::new("directory"),
            file: OperationSlot::new("file"),
            search: OperationSlot::new("search"),
            debounce: Debouncer::new(search.debounce()),
            min_query_len: search.min_query_len,
            back_stack: Vec::new(),
            entries: Vec::new(),
            open_file: None,
            query: String::new(),
            results: Vec::new(),
            error: None,
        }
    }

    pub fn current_path(&self) -> &str {
        self.directory
            .current_key()
            .map(String::as_str)
            .unwrap_or(ROOT)
    }

    // ═══════════════════════════════════════════
    // Navigation
    // ═══════════════════════════════════════════

    /// Start loading `path`; `None` when it is already the current directory
    pub fn navigate(&mut self, path: &str) -> Option<Ticket<String>> {
        let path = normalize(path);
        let current = self.current_path().to_string();
        if self.directory.current_key().is_some() && current == path {
            return None;
        }
        if self.directory.current_key().is_some() || path != ROOT {
            self.back_stack.push(current);
        }
        Some(self.directory.begin(path))
    }

    /// Return to the previous directory, if any
    pub fn go_back(&mut self) -> Option<Ticket<String>> {
        let previous = self.back_stack.pop()?;
        Some(self.directory.begin(previous))
    }

    /// Reload the current directory
    pub fn refresh(&mut self) -> Ticket<String> {
        let path = self.current_path().to_string();
        self.directory.begin(path)
    }

    /// Drop all navigation state and start over at the root
    pub fn reset(&mut self) -> Ticket<String> {
        self.cancel_all();
        self.directory.reset();
        self.file.reset();
        self.search.reset();
        self.back_stack.clear();
        self.entries.clear();
        self.open_file = None;
        self.query.clear();
        self.results.clear();
        self.error = None;
        self.directory.begin(ROOT.to_string())
    }

    /// Cancel every in-flight operation and the pending search timer
    pub fn cancel_all(&mut self) {
        self.directory.cancel();
        self.file.cancel();
        self.search.cancel();
        self.debounce.cancel();
    }

    pub fn apply_directory(
        &mut self,
        generation: u64,
        result: Result<Vec<DirEntry>>,
        git_status: &HashMap<String, FileStatus>,
    ) -> Option<ErrorNotice> {
        if !self.directory.complete(generation) {
            return None;
        }
        match result {
            Ok(mut entries) => {
                enrich(&mut entries, git_status);
                self.entries = entries;
                self.error = None;
                None
            }
            Err(e) => self.fail(e.notice()),
        }
    }

    /// Re-apply git decoration after the status map changed
    pub fn enrich(&mut self, git_status: &HashMap<String, FileStatus>) {
        enrich(&mut self.entries, git_status);
    }

    // ═══════════════════════════════════════════
    // File viewing
    // ═══════════════════════════════════════════

    pub fn open_file(&mut self, path: &str) -> Ticket<String> {
        self.open_file = None;
        self.file.begin(normalize(path))
    }

    pub fn close_file(&mut self) {
        self.file.reset();
        self.open_file = None;
    }

    pub fn apply_file(&mut self, generation: u64, result: Result<FileContent>) -> Option<ErrorNotice> {
        if !self.file.complete(generation) {
            return None;
        }
        match result {
            Ok(content) => {
                self.open_file = Some(content);
                self.error = None;
                None
            }
            Err(e) => self.fail(e.notice()),
        }
    }

    // ═══════════════════════════════════════════
    // Search
    // ═══════════════════════════════════════════

    /// Record the query and arm the debounce timer.
    ///
    /// Short queries clear the results, cancel any pending or running
    /// search and return `false`.
    pub fn update_query<M, F>(&mut self, query: &str, tx: &mpsc::UnboundedSender<M>, make: F) -> bool
    where
        M: Send + 'static,
        F: FnOnce(u64) -> M,
    {
        self.query = query.to_string();
        let trimmed = query.trim();
        if self.search.current_key().is_some_and(|key| key != trimmed) {
            self.search.cancel();
        }
        if trimmed.chars().count() < self.min_query_len {
            self.debounce.cancel();
            self.search.cancel();
            self.results.clear();
            return false;
        }
        self.debounce.schedule(tx, make);
        true
    }

    /// Debounce timer elapsed; start the search if the timer is still current
    pub fn start_search(&mut self, debounce_generation: u64) -> Option<Ticket<String>> {
        if !self.debounce.fire(debounce_generation) {
            return None;
        }
        Some(self.search.begin(self.query.trim().to_string()))
    }

    pub fn apply_search(&mut self, generation: u64, result: Result<Vec<SearchHit>>) -> Option<ErrorNotice> {
        if !self.search.complete(generation) {
            return None;
        }
        match result {
            Ok(hits) => {
                self.results = hits;
                None
            }
            Err(e) => self.fail(e.notice()),
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    fn fail(&mut self, notice: Option<ErrorNotice>) -> Option<ErrorNotice> {
        if notice.is_some() {
            self.error = notice.clone();
        }
        notice
    }

    pub fn snapshot(&self) -> BrowserSnapshot {
        BrowserSnapshot {
            current_path: self.current_path().to_string(),
            entries: self.entries.clone(),
            can_go_back: !self.back_stack.is_empty(),
            open_file: self.open_file.clone(),
            search_query: self.query.clone(),
            search_results: self.results.clone(),
            loading_directory: self.directory.in_flight(),
            loading_file: self.file.in_flight(),
            searching: self.search.in_flight() || self.debounce.is_pending(),
            error: self.error.clone(),
        }
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches("./")
        .trim_matches('/')
        .to_string()
}

/// Decorate entries with git status; a directory is marked changed when
/// any path beneath it has a status.
fn enrich(entries: &mut [DirEntry], git_status: &HashMap<String, FileStatus>) {
    for entry in entries.iter_mut() {
        let path = normalize(&entry.path);
        entry.git_status = git_status.get(&path).copied();
        entry.has_changes = if entry.is_dir {
            let prefix = format!("{}/", path);
            git_status.keys().any(|p| p.starts_with(&prefix))
        } else {
            entry.git_status.is_some()
        };
    }
}
