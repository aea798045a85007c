//! OperationSlot - one authoritative in-flight operation per class
//!
//! Every `begin` bumps a generation counter, cancels the previous operation's
//! token and hands out a [`Ticket`]. When the background work finishes, its
//! completion is applied only if the ticket's generation is still the current
//! one; anything else is a stale result and is dropped without side effects.
//!
//! Cancellation is cooperative: the token asks the background future to stop,
//! but correctness only depends on the generation check at completion time.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{LookoutError, Result};

/// Handle for one started operation
#[derive(Debug, Clone)]
pub struct Ticket<K> {
    pub key: K,
    pub generation: u64,
    token: CancellationToken,
}

impl<K> Ticket<K> {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Drive `work` until it finishes or the ticket is cancelled.
    ///
    /// Cancellation resolves to [`LookoutError::Cancelled`].
    pub async fn run<T, F>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(LookoutError::Cancelled),
            result = work => result,
        }
    }
}

#[derive(Debug)]
struct Active {
    generation: u64,
    token: CancellationToken,
}

/// Controller for one operation class (directory load, file open, search...)
#[derive(Debug)]
pub struct OperationSlot<K> {
    name: &'static str,
    generation: u64,
    active: Option<Active>,
    current_key: Option<K>,
}

impl<K: Clone + PartialEq + std::fmt::Debug> OperationSlot<K> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            generation: 0,
            active: None,
            current_key: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Start a new operation for `key`, superseding any running one
    pub fn begin(&mut self, key: K) -> Ticket<K> {
        if let Some(prev) = self.active.take() {
            debug!(class = self.name, generation = prev.generation, "superseding operation");
            prev.token.cancel();
        }

        self.generation += 1;
        let token = CancellationToken::new();
        self.active = Some(Active {
            generation: self.generation,
            token: token.clone(),
        });
        self.current_key = Some(key.clone());

        Ticket {
            key,
            generation: self.generation,
            token,
        }
    }

    /// Whether a completion for `generation` may still be applied
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.generation == generation)
    }

    /// Mark the operation for `generation` finished.
    ///
    /// Returns `false` (and changes nothing) when the completion is stale.
    pub fn complete(&mut self, generation: u64) -> bool {
        if !self.is_current(generation) {
            debug!(
                class = self.name,
                generation,
                current = self.generation,
                "dropping stale completion"
            );
            return false;
        }
        self.active = None;
        true
    }

    /// Cancel the in-flight operation; its completion will be discarded
    pub fn cancel(&mut self) {
        if let Some(prev) = self.active.take() {
            prev.token.cancel();
        }
    }

    /// Cancel and forget the current key
    pub fn reset(&mut self) {
        self.cancel();
        self.current_key = None;
    }

    pub fn in_flight(&self) -> bool {
        self.active.is_some()
    }

    /// Key of the most recently started operation
    pub fn current_key(&self) -> Option<&K> {
        self.current_key.as_ref()
    }
}
