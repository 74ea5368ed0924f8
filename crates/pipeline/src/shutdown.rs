//! A tiny cooperative shutdown signal shared by the worker pool and the
//! auxiliary loops, so `stop(timeout)` can wake every sleeping task
//! immediately rather than waiting out its current sleep/poll interval.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

#[derive(Default)]
pub struct ShutdownSignal {
    flag: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }

    /// Resolves as soon as `trigger` is called. Intended for use in a
    /// `tokio::select!` alongside a sleep or queue poll.
    pub async fn triggered(&self) {
        if self.is_set() {
            return;
        }
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn triggered_resolves_immediately_once_set() {
        let signal = Arc::new(ShutdownSignal::new());
        signal.trigger();
        signal.triggered().await;
        assert!(signal.is_set());
    }

    #[tokio::test]
    async fn waiter_wakes_when_triggered_concurrently() {
        let signal = Arc::new(ShutdownSignal::new());
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move {
                signal.triggered().await;
            })
        };
        tokio::task::yield_now().await;
        signal.trigger();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should wake promptly")
            .unwrap();
    }
}
