// src/engine/timer.rs

//! Cancellable one-shot timers.
//!
//! The orchestrator never sleeps itself; it asks a [`TimerScheduler`] to call
//! back later. Production uses [`TokioTimers`]; tests plug in a scheduler
//! whose clock they advance by hand.

use std::fmt;
use std::time::Duration;

/// Invoked once when a timer expires.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

pub trait TimerScheduler: Send + Sync {
    /// Call `fire` once `delay` has elapsed, unless the returned handle is
    /// cancelled first.
    fn schedule(&self, delay: Duration, fire: TimerCallback) -> TimerHandle;
}

/// Cancels its timer on [`TimerHandle::cancel`]. Dropping the handle leaves
/// the timer armed.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("armed", &self.cancel.is_some())
            .finish()
    }
}

/// Timers backed by `tokio::time::sleep` on spawned tasks.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimers;

impl TimerScheduler for TokioTimers {
    fn schedule(&self, delay: Duration, fire: TimerCallback) -> TimerHandle {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        TimerHandle::new(move || task.abort())
    }
}
