//! Rate limiters deciding how long a re-added queue item waits.
//!
//! The default controller limiter is the maximum of a per-item exponential
//! backoff and an overall token bucket, so a single hot item backs off on its
//! own while a burst of items is still paced globally.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::QueueConfig;

pub trait RateLimiter<T>: Send + Sync {
    /// How long `item` should wait before being added again. Counts as a requeue.
    fn when(&self, item: &T) -> Duration;

    /// Clears the requeue history of `item`.
    fn forget(&self, item: &T);

    /// Number of times `item` has been requeued since it was last forgotten.
    fn num_requeues(&self, item: &T) -> u32;
}

/// `base * 2^requeues`, capped at `max`.
pub struct ItemExponentialRateLimiter<T> {
    base: Duration,
    max: Duration,
    failures: Mutex<HashMap<T, u32>>,
}

impl<T> ItemExponentialRateLimiter<T> {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            failures: Mutex::new(HashMap::new()),
        }
    }
}

impl<T> RateLimiter<T> for ItemExponentialRateLimiter<T>
where
    T: Hash + Eq + Clone + Send,
{
    fn when(&self, item: &T) -> Duration {
        let mut failures = self.failures.lock().unwrap_or_else(|e| e.into_inner());
        let count = failures.entry(item.clone()).or_insert(0);
        let exp = *count;
        *count = count.saturating_add(1);

        2u32.checked_pow(exp)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    fn forget(&self, item: &T) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(item);
    }

    fn num_requeues(&self, item: &T) -> u32 {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(item)
            .copied()
            .unwrap_or(0)
    }
}

struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Longest delay the bucket hands out, however deep it is in debt.
pub const MAX_BUCKET_DELAY: Duration = Duration::from_secs(1000);

/// Overall token bucket: `qps` tokens per second, holding at most `burst`.
///
/// A `qps` that is not a positive finite number disables the bucket.
pub struct BucketRateLimiter {
    qps: Option<f64>,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl BucketRateLimiter {
    pub fn new(qps: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            qps: (qps.is_finite() && qps > 0.0).then_some(qps),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    /// Reserves one token and returns how long until it becomes available.
    fn reserve(&self) -> Duration {
        let Some(qps) = self.qps else {
            return Duration::ZERO;
        };

        let mut bucket = self.bucket.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * qps).min(self.burst);
        bucket.last = now;
        bucket.tokens -= 1.0;

        if bucket.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(-bucket.tokens / qps)
                .map_or(MAX_BUCKET_DELAY, |delay| delay.min(MAX_BUCKET_DELAY))
        }
    }
}

impl<T> RateLimiter<T> for BucketRateLimiter {
    fn when(&self, _item: &T) -> Duration {
        self.reserve()
    }

    fn forget(&self, _item: &T) {}

    fn num_requeues(&self, _item: &T) -> u32 {
        0
    }
}

/// Waits for the longest of the inner limiters.
pub struct MaxOfRateLimiter<T> {
    limiters: Vec<Box<dyn RateLimiter<T>>>,
}

impl<T> MaxOfRateLimiter<T> {
    pub fn new(limiters: Vec<Box<dyn RateLimiter<T>>>) -> Self {
        Self { limiters }
    }
}

impl<T> RateLimiter<T> for MaxOfRateLimiter<T> {
    fn when(&self, item: &T) -> Duration {
        self.limiters
            .iter()
            .map(|limiter| limiter.when(item))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    fn forget(&self, item: &T) {
        for limiter in &self.limiters {
            limiter.forget(item);
        }
    }

    fn num_requeues(&self, item: &T) -> u32 {
        self.limiters
            .iter()
            .map(|limiter| limiter.num_requeues(item))
            .max()
            .unwrap_or(0)
    }
}

/// Per-item exponential backoff combined with the overall bucket.
pub fn controller_rate_limiter<T>(config: &QueueConfig) -> MaxOfRateLimiter<T>
where
    T: Hash + Eq + Clone + Send + 'static,
{
    MaxOfRateLimiter::new(vec![
        Box::new(ItemExponentialRateLimiter::new(
            config.base_delay,
            config.max_delay,
        )),
        Box::new(BucketRateLimiter::new(config.qps, config.burst)),
    ])
}
