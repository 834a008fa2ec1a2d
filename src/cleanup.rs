// Deferred side effects with a cancelable handle

use std::time::Duration;
use tokio::task::AbortHandle;

/// A callback that runs once after a delay unless cancelled first.
///
/// Dropping the handle cancels the callback, so a superseded cleanup can
/// never fire late.
#[derive(Debug)]
pub struct ScheduledCleanup {
    handle: AbortHandle,
}

impl ScheduledCleanup {
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(delay: Duration, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        Self {
            handle: task.abort_handle(),
        }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[allow(dead_code)]
    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for ScheduledCleanup {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_action(counter: &Arc<AtomicUsize>) -> impl FnOnce() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_fires_after_delay() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cleanup = ScheduledCleanup::schedule(Duration::from_millis(300), counter_action(&counter));

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(cleanup.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_cleanup_never_fires() {
        let counter = Arc::new(AtomicUsize::new(0));
        let cleanup = ScheduledCleanup::schedule(Duration::from_millis(300), counter_action(&counter));
        cleanup.cancel();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels() {
        let counter = Arc::new(AtomicUsize::new(0));
        drop(ScheduledCleanup::schedule(
            Duration::from_millis(300),
            counter_action(&counter),
        ));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
