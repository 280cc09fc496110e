//! Rate limiting for progress writes and pause detection.

use std::sync::Mutex;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Fixed-window throttle: the first call opens a window and passes, every
/// other call inside that window is dropped. The window only moves when a
/// call is let through.
#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    window_start: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            window_start: Mutex::new(None),
        }
    }

    /// Returns `true` if the caller may proceed.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut start = self.window_start.lock().unwrap_or_else(|e| e.into_inner());
        match *start {
            Some(opened) if now.saturating_duration_since(opened) < self.window => false,
            _ => {
                *start = Some(now);
                true
            }
        }
    }

    /// Forget the current window so the next call passes.
    pub fn reset(&self) {
        *self.window_start.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Trailing-edge debounce: runs the action once `delay` has passed without
/// another call. Each call replaces the pending action.
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Arm (or re-arm) the timer. Returns `false` when there is no tokio
    /// runtime to run the timer on; the action is then dropped.
    pub fn call<F>(&self, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let Ok(handle) = Handle::try_current() else {
            tracing::warn!("debounce armed outside a tokio runtime, ignoring");
            return false;
        };

        let delay = self.delay;
        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            action();
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
        true
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = pending.take() {
            task.abort();
        }
    }
}

impl Drop for Debounce {
    fn drop(&mut self) {
        self.cancel();
    }
}
