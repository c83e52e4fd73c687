use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Debouncer
///
/// One pending timer per input field. Every `schedule` cancels the pending
/// action and starts the quiet period over; `fire_now` (the Enter key) cancels
/// the pending action and runs the new one without waiting.
///
/// Clones share the same timer slot.
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// schedule
    ///
    /// Runs `action` once `delay` has passed with no further `schedule` or
    /// `fire_now` call.
    pub fn schedule<F>(&self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let mut slot = self.pending.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// fire_now
    ///
    /// Cancels whatever is pending and runs `action` immediately.
    pub async fn fire_now<F>(&self, action: F)
    where
        F: Future<Output = ()>,
    {
        self.cancel();
        action.await;
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        // Last clone going away takes the timer with it.
        if Arc::strong_count(&self.pending) == 1 {
            self.cancel();
        }
    }
}
