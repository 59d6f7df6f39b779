// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs an action once a burst of calls to [`Debouncer::schedule`] settles.
///
/// Each call cancels the pending action from the previous call. An action
/// that already started is not interrupted.
pub struct Debouncer {
    interval: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `action` after the interval unless `schedule` or `cancel` is
    /// called first, or `parent` is cancelled.
    pub fn schedule<F>(&self, parent: &CancellationToken, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let interval = self.interval;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(interval) => action.await,
            }
        });
    }

    pub fn cancel(&self) {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(token) = pending {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting(counter: &Arc<AtomicUsize>, value: usize) -> impl Future<Output = ()> + Send {
        let counter = Arc::clone(counter);
        async move {
            counter.store(value, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_last_action_runs() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let root = CancellationToken::new();
        let last = Arc::new(AtomicUsize::new(0));

        for value in 1..=3 {
            debouncer.schedule(&root, counting(&last, value));
            tokio::time::sleep(Duration::from_millis(40)).await;
        }
        assert_eq!(last.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_parent_cancellation() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let root = CancellationToken::new();
        let last = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(&root, counting(&last, 1));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(last.load(Ordering::SeqCst), 0);

        debouncer.schedule(&root, counting(&last, 2));
        root.cancel();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(last.load(Ordering::SeqCst), 0);
    }
}
