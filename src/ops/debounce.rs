//! Debouncer - delayed, cancellable start of an operation
//!
//! `schedule` always cancels the previously scheduled start before arming a
//! new timer. When the timer elapses, the prepared message is posted to the
//! owner's channel; the owner then calls [`Debouncer::fire`] to confirm the
//! message still belongs to the latest schedule.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer; `make` builds the message from the schedule generation
    pub fn schedule<M, F>(&mut self, tx: &mpsc::UnboundedSender<M>, make: F) -> u64
    where
        M: Send + 'static,
        F: FnOnce(u64) -> M,
    {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let message = make(generation);
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let delay = self.delay;
        let tx = tx.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(message);
                }
            }
        });

        self.pending = Some(token);
        generation
    }

    /// Drop the scheduled start, if any
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Accept a timer message; `false` when it was superseded or cancelled
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            return true;
        }
        false
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_fires_only_latest() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.schedule(&tx, |g| (g, "ab"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        debouncer.schedule(&tx, |g| (g, "abc"));

        let (generation, query) = rx.recv().await.unwrap();
        assert_eq!(query, "abc");
        assert!(debouncer.fire(generation));
        assert!(!debouncer.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_fire() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        debouncer.schedule(&tx, |g| g);
        debouncer.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
        assert!(!debouncer.fire(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_full_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel::<u64>();
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        debouncer.schedule(&tx, |g| g);

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert!(rx.try_recv().is_err());

        let fired = tokio::time::timeout(Duration::from_millis(10), rx.recv())
            .await
            .unwrap();
        assert_eq!(fired, Some(1));
    }
}
