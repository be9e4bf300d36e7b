//! Debounced write coalescing.
//!
//! One timer per key. Scheduling again for the same key cancels the previous
//! timer, so a burst of edits produces a single write once the key has been
//! quiet for the configured delay. A write that has already started is never
//! cancelled by a later schedule; it runs to completion on its own task.

use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct ArmedTimer {
    ticket: u64,
    handle: JoinHandle<()>,
}

type TimerMap<K> = Arc<Mutex<HashMap<K, ArmedTimer>>>;

fn lock<K>(timers: &TimerMap<K>) -> MutexGuard<'_, HashMap<K, ArmedTimer>> {
    timers.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-key debounce timers. Must be used from within a Tokio runtime.
pub struct WriteCoalescer<K> {
    delay: Duration,
    timers: TimerMap<K>,
    tickets: AtomicU64,
}

impl<K> WriteCoalescer<K>
where
    K: Eq + Hash + Clone + Debug + Send + 'static,
{
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: Arc::new(Mutex::new(HashMap::new())),
            tickets: AtomicU64::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm (or re-arm) the timer for `key`; `write` runs once it expires.
    pub fn schedule<F, Fut>(&self, key: K, write: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let timers = Arc::clone(&self.timers);
        let delay = self.delay;

        // Held across the spawn so the timer can never look itself up before
        // it has been registered.
        let mut armed = lock(&self.timers);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let fired = {
                let mut timers = lock(&timers);
                let key = timers
                    .iter()
                    .find(|(_, timer)| timer.ticket == ticket)
                    .map(|(key, _)| key.clone());
                match key {
                    Some(key) => {
                        debug!("⏰ Coalescing timer fired for {:?}", key);
                        timers.remove(&key).is_some()
                    }
                    None => false,
                }
            };
            if fired {
                write().await;
            }
        });

        if let Some(previous) = armed.insert(key.clone(), ArmedTimer { ticket, handle }) {
            debug!("Re-armed coalescing timer for {:?}", key);
            previous.handle.abort();
        } else {
            debug!("Armed coalescing timer for {:?} ({:?})", key, delay);
        }
    }

    /// Cancel the pending timer for `key`. Returns whether one was armed.
    pub fn cancel(&self, key: &K) -> bool {
        match lock(&self.timers).remove(key) {
            Some(timer) => {
                debug!("Cancelled coalescing timer for {:?}", key);
                timer.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Move a pending timer to a new key without resetting its deadline
    pub fn rekey(&self, from: &K, to: K) {
        let mut timers = lock(&self.timers);
        if let Some(timer) = timers.remove(from) {
            debug!("Moved coalescing timer {:?} -> {:?}", from, to);
            if let Some(displaced) = timers.insert(to, timer) {
                displaced.handle.abort();
            }
        }
    }

    pub fn is_armed(&self, key: &K) -> bool {
        lock(&self.timers).contains_key(key)
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.timers).len()
    }

    /// Cancel every pending timer and return the keys they were armed for,
    /// so the caller can perform those writes right away.
    pub fn take_all(&self) -> Vec<K> {
        lock(&self.timers)
            .drain()
            .map(|(key, timer)| {
                timer.handle.abort();
                key
            })
            .collect()
    }

    pub fn cancel_all(&self) {
        let cancelled = self.take_all();
        if !cancelled.is_empty() {
            debug!("Cancelled {} pending coalescing timer(s)", cancelled.len());
        }
    }
}

impl<K> Drop for WriteCoalescer<K> {
    fn drop(&mut self) {
        for (_, timer) in lock(&self.timers).drain() {
            timer.handle.abort();
        }
    }
}
