//! One-shot deferred actions that can be cancelled or fired early.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

type Action = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a scheduled action. Dropping the handle cancels the action.
pub struct TimerHandle {
    action: Arc<Mutex<Option<Action>>>,
    task: JoinHandle<()>,
}

/// Run `action` once after `delay` unless cancelled first.
pub fn schedule<F>(delay: Duration, action: F) -> TimerHandle
where
    F: FnOnce() + Send + 'static,
{
    let action: Arc<Mutex<Option<Action>>> = Arc::new(Mutex::new(Some(Box::new(action))));
    let pending = Arc::clone(&action);
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Some(action) = take(&pending) {
            action();
        }
    });
    TimerHandle { action, task }
}

fn take(slot: &Mutex<Option<Action>>) -> Option<Action> {
    match slot.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    }
}

impl TimerHandle {
    /// Cancel the action. Returns false if it already ran.
    pub fn cancel(&self) -> bool {
        self.task.abort();
        take(&self.action).is_some()
    }

    /// Run the action now instead of waiting. Returns false if it already ran.
    pub fn fire_now(&self) -> bool {
        self.task.abort();
        match take(&self.action) {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    /// Whether the action has run or been cancelled.
    pub fn is_done(&self) -> bool {
        match self.action.lock() {
            Ok(guard) => guard.is_none(),
            Err(poisoned) => poisoned.into_inner().is_none(),
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> (Arc<AtomicU32>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&count);
        (count, move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() {
        let (count, action) = counter();
        let handle = schedule(Duration::from_secs(3), action);

        tokio::time::sleep(Duration::from_millis(2999)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!handle.is_done());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(handle.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let (count, action) = counter();
        let handle = schedule(Duration::from_secs(3), action);

        assert!(handle.cancel());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!handle.cancel());
    }

    #[tokio::test(start_paused = true)]
    async fn fire_now_runs_once() {
        let (count, action) = counter();
        let handle = schedule(Duration::from_secs(3), action);

        assert!(handle.fire_now());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!handle.fire_now());
    }

    #[tokio::test(start_paused = true)]
    async fn drop_cancels() {
        let (count, action) = counter();
        drop(schedule(Duration::from_secs(1), action));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
