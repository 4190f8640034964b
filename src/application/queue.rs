//! Bounded event queue that favors recency over completeness.
//!
//! Publishing never waits: when the queue is full the oldest buffered item
//! is evicted to make room. Order is preserved for everything that survives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

struct Shared<T> {
    buffer: Mutex<VecDeque<T>>,
    capacity: usize,
    notify: Notify,
    publishers: AtomicUsize,
    dropped: AtomicU64,
}

/// Create a queue holding at most `capacity` items (minimum 1).
pub fn drop_oldest<T>(capacity: usize) -> (Publisher<T>, Subscriber<T>) {
    let capacity = capacity.max(1);
    let shared = Arc::new(Shared {
        buffer: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity,
        notify: Notify::new(),
        publishers: AtomicUsize::new(1),
        dropped: AtomicU64::new(0),
    });
    (
        Publisher {
            shared: shared.clone(),
        },
        Subscriber { shared },
    )
}

/// Sending half; cheap to clone.
pub struct Publisher<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Publisher<T> {
    /// Enqueue an item, evicting the oldest one if the queue is full.
    ///
    /// Returns true if an item was evicted.
    pub fn publish(&self, item: T) -> bool {
        let evicted = {
            let mut buffer = self.shared.buffer.lock();
            let evicted = if buffer.len() >= self.shared.capacity {
                buffer.pop_front().is_some()
            } else {
                false
            };
            buffer.push_back(item);
            evicted
        };
        if evicted {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        self.shared.notify.notify_one();
        evicted
    }

    /// Total number of items evicted so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        self.shared.publishers.fetch_add(1, Ordering::AcqRel);
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Drop for Publisher<T> {
    fn drop(&mut self) {
        if self.shared.publishers.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Wake the subscriber so it can observe the close.
            self.shared.notify.notify_one();
        }
    }
}

/// Receiving half.
pub struct Subscriber<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Subscriber<T> {
    /// Wait for the next item.
    ///
    /// Returns `None` once every publisher is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<T> {
        loop {
            let next = self.shared.buffer.lock().pop_front();
            if next.is_some() {
                return next;
            }
            if self.shared.publishers.load(Ordering::Acquire) == 0 {
                return None;
            }
            self.shared.notify.notified().await;
        }
    }

    /// Take the next item without waiting.
    pub fn try_recv(&mut self) -> Option<T> {
        self.shared.buffer.lock().pop_front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of items evicted so far.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}
