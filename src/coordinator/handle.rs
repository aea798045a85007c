//! Handle held by presentation: send intents, read snapshots

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;

use super::intent::{Intent, Notification};
use super::snapshot::Snapshot;
use crate::error::{LookoutError, Result};

pub struct CoordinatorHandle {
    pub(super) intents: mpsc::Sender<Intent>,
    pub(super) snapshots: watch::Receiver<Snapshot>,
    pub(super) notifications: broadcast::Sender<Notification>,
    pub(super) task: JoinHandle<()>,
}

impl CoordinatorHandle {
    pub async fn send(&self, intent: Intent) -> Result<()> {
        self.intents
            .send(intent)
            .await
            .map_err(|_| LookoutError::Other("coordinator has stopped".to_string()))
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for<F>(&self, timeout: Duration, predicate: F) -> Result<Snapshot>
    where
        F: FnMut(&Snapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let waited = tokio::time::timeout(timeout, rx.wait_for(predicate))
            .await
            .map_err(|_| LookoutError::Timeout {
                operation: "snapshot condition".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            })?;

        match waited {
            Ok(snapshot) => Ok((*snapshot).clone()),
            Err(_) => Err(LookoutError::Other("coordinator has stopped".to_string())),
        }
    }

    /// Stop the coordinator and wait for its task to finish
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.intents.send(Intent::Shutdown).await;
        self.task
            .await
            .map_err(|e| LookoutError::Other(format!("coordinator task failed: {}", e)))
    }
}
