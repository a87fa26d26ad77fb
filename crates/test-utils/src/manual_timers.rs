use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use devrunner::engine::{TimerCallback, TimerHandle, TimerScheduler};

/// Timer scheduler with a virtual clock that only moves on [`ManualTimers::advance`].
///
/// Callbacks run synchronously inside `advance`, in due order.
#[derive(Clone, Default)]
pub struct ManualTimers {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    now: Duration,
    entries: Vec<Entry>,
    scheduled: usize,
}

struct Entry {
    due: Duration,
    fire: TimerCallback,
    cancelled: Arc<AtomicBool>,
}

impl ManualTimers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed so far.
    pub fn now(&self) -> Duration {
        self.inner.lock().unwrap().now
    }

    /// Armed, uncancelled timers.
    pub fn pending(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .entries
            .iter()
            .filter(|e| !e.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Total number of `schedule` calls.
    pub fn scheduled(&self) -> usize {
        self.inner.lock().unwrap().scheduled
    }

    /// Move the clock forward, firing every timer that falls due.
    pub fn advance(&self, by: Duration) {
        let target = self.now() + by;

        loop {
            let next = {
                let mut inner = self.inner.lock().unwrap();
                inner.entries.retain(|e| !e.cancelled.load(Ordering::SeqCst));
                let idx = inner
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.due <= target)
                    .min_by_key(|(_, e)| e.due)
                    .map(|(i, _)| i);
                idx.map(|i| {
                    let entry = inner.entries.remove(i);
                    inner.now = entry.due.max(inner.now);
                    entry.fire
                })
            };

            // Fire without holding the lock so callbacks may schedule more.
            match next {
                Some(fire) => fire(),
                None => break,
            }
        }

        self.inner.lock().unwrap().now = target;
    }
}

impl TimerScheduler for ManualTimers {
    fn schedule(&self, delay: Duration, fire: TimerCallback) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        {
            let mut inner = self.inner.lock().unwrap();
            let due = inner.now + delay;
            inner.scheduled += 1;
            inner.entries.push(Entry {
                due,
                fire,
                cancelled: Arc::clone(&cancelled),
            });
        }
        TimerHandle::new(move || cancelled.store(true, Ordering::SeqCst))
    }
}
