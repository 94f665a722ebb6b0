//! Time-delayed FIFO used to model added network latency.
//!
//! Both endpoints reuse the same queue: the server delays inbound inputs and
//! outbound broadcasts, the client delays inbound state messages. Payloads are
//! stamped with a release time on enqueue and only handed back once that time
//! has elapsed. Callers pass the current time explicitly so tests can drive
//! the queue without touching the wall clock.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug)]
struct Envelope<T> {
    release_at: f64,
    payload: T,
}

/// Generic delay queue: enqueue from one task, drain from another.
///
/// Enqueue order is monotonic in release time in practice, but correctness
/// does not depend on it: `drain_ready` returns entries in non-decreasing
/// release-time order and never releases anything early.
#[derive(Debug)]
pub struct DelayQueue<T> {
    delay: f64,
    queue: Mutex<VecDeque<Envelope<T>>>,
}

impl<T> DelayQueue<T> {
    /// Creates a queue with a fixed per-entry delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay: delay.as_secs_f64(),
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Envelope<T>>> {
        // A panic while holding the lock leaves plain data behind, safe to reuse.
        self.queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stamps the payload with `now + delay` and appends it.
    pub fn enqueue(&self, payload: T, now: f64) {
        self.lock().push_back(Envelope {
            release_at: now + self.delay,
            payload,
        });
    }

    /// Removes and returns every entry whose release time has elapsed, in
    /// non-decreasing release-time order. Later entries stay queued.
    pub fn drain_ready(&self, now: f64) -> Vec<T> {
        let mut ready = Vec::new();
        {
            let mut queue = self.lock();
            let mut pending = VecDeque::with_capacity(queue.len());
            for envelope in queue.drain(..) {
                if envelope.release_at <= now {
                    ready.push(envelope);
                } else {
                    pending.push_back(envelope);
                }
            }
            *queue = pending;
        }

        // Stable sort keeps FIFO order among entries sharing a release time.
        ready.sort_by(|a, b| {
            a.release_at
                .partial_cmp(&b.release_at)
                .unwrap_or(Ordering::Equal)
        });
        ready.into_iter().map(|envelope| envelope.payload).collect()
    }

    /// Discards all pending entries.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
