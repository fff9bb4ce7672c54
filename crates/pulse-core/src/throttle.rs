//! Minimum-spacing throttle for outbound calls to one remote source.
//!
//! A single `last_request` stamp per instance, guarded by an async mutex that
//! queues waiters in submission order. It spaces call start times; it does not
//! limit how many calls are in flight and it never retries.

use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Spacing for feeds allowing roughly one request per second.
pub const STANDARD_FEED_INTERVAL: Duration = Duration::from_millis(1100);

/// Spacing for feeds with a strict per-minute quota (five requests a minute).
pub const STRICT_QUOTA_INTERVAL: Duration = Duration::from_secs(12);

#[derive(Debug)]
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {}ms", remaining.as_millis());
                sleep(remaining).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Enforces a minimum interval between the starts of consecutive calls.
#[derive(Debug)]
pub struct Throttle {
    limiter: Mutex<RateLimiter>,
}

impl Throttle {
    /// Create a throttle spacing calls by at least `min_interval`.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            limiter: Mutex::new(RateLimiter {
                last_request: None,
                min_interval,
            }),
        }
    }

    /// Throttle for roughly one request per second.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(STANDARD_FEED_INTERVAL)
    }

    /// Throttle for five-requests-a-minute quotas.
    #[must_use]
    pub fn strict_quota() -> Self {
        Self::new(STRICT_QUOTA_INTERVAL)
    }

    /// The configured minimum interval.
    pub async fn min_interval(&self) -> Duration {
        self.limiter.lock().await.min_interval
    }

    /// Waits for this caller's slot, then runs `request`.
    ///
    /// The request's own result, including errors, is returned untouched.
    pub async fn throttle<F, Fut, T>(&self, request: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.limiter.lock().await.wait().await;
        request().await
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::standard()
    }
}
