//! Deduplicating, rate-limited work queue.
//!
//! Items move between three sets:
//! - `dirty`: needs processing (queued or parked behind an in-flight copy)
//! - `processing`: handed out by [`WorkQueue::get`] and not yet [`WorkQueue::done`]
//! - `queue`: FIFO order of dirty items that are not being processed
//!
//! An item is never handed out twice concurrently. Adding an item that is being
//! processed parks it in `dirty` and it is re-queued when `done` is called.

use std::collections::HashSet;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::rate_limiter::RateLimiter;

struct State<T> {
    queue: VecDeque<T>,
    dirty: HashSet<T>,
    processing: HashSet<T>,
}

struct Inner<T> {
    state: Mutex<State<T>>,
    notify: Notify,
    shutdown: CancellationToken,
    rate_limiter: Box<dyn RateLimiter<T>>,
}

/// Cloneable handle to a shared work queue.
pub struct WorkQueue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> WorkQueue<T>
where
    T: Clone + Eq + Hash + Debug + Send + Sync + 'static,
{
    /// Creates a queue that shuts down when `shutdown` is cancelled.
    pub fn new(rate_limiter: impl RateLimiter<T> + 'static, shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    dirty: HashSet::new(),
                    processing: HashSet::new(),
                }),
                notify: Notify::new(),
                shutdown,
                rate_limiter: Box::new(rate_limiter),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State<T>> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Marks `item` as needing processing. No-op if it is already pending.
    pub fn add(&self, item: T) {
        if self.is_shutting_down() {
            return;
        }

        let mut state = self.state();
        if state.dirty.contains(&item) {
            return;
        }
        state.dirty.insert(item.clone());
        if state.processing.contains(&item) {
            return;
        }
        state.queue.push_back(item);
        drop(state);

        self.inner.notify.notify_one();
    }

    /// Adds `item` once `delay` has elapsed, unless the queue shuts down first.
    pub fn add_after(&self, item: T, delay: Duration) {
        if self.is_shutting_down() {
            return;
        }
        if delay.is_zero() {
            self.add(item);
            return;
        }

        let queue = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = queue.inner.shutdown.cancelled() => {
                    debug!(?item, "dropping delayed add on shutdown");
                }
                _ = tokio::time::sleep(delay) => queue.add(item),
            }
        });
    }

    /// Adds `item` after the rate limiter says it is allowed to.
    pub fn add_rate_limited(&self, item: T) {
        let delay = self.inner.rate_limiter.when(&item);
        self.add_after(item, delay);
    }

    /// Clears the rate limiter history of `item`.
    pub fn forget(&self, item: &T) {
        self.inner.rate_limiter.forget(item);
    }

    pub fn num_requeues(&self, item: &T) -> u32 {
        self.inner.rate_limiter.num_requeues(item)
    }

    /// Waits for the next item. Returns `None` once the queue is shutting down,
    /// regardless of how many items are still queued.
    pub async fn get(&self) -> Option<T> {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_shutting_down() {
                return None;
            }

            {
                let mut state = self.state();
                if let Some(item) = state.queue.pop_front() {
                    state.dirty.remove(&item);
                    state.processing.insert(item.clone());
                    return Some(item);
                }
            }

            tokio::select! {
                _ = self.inner.shutdown.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Marks `item` as processed. A copy added meanwhile is queued again.
    pub fn done(&self, item: &T) {
        let mut state = self.state();
        state.processing.remove(item);
        if state.dirty.contains(item) {
            state.queue.push_back(item.clone());
            drop(state);
            self.inner.notify.notify_one();
        }
    }

    /// Number of items waiting to be handed out.
    pub fn len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shut_down(&self) {
        self.inner.shutdown.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }
}
