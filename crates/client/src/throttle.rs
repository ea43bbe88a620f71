//! Token-bucket throttle for proxy requests.
//!
//! Invariants:
//! - At most `burst` requests proceed without waiting.
//! - Sustained throughput does not exceed `qps` requests per second.
//! - Waiters are served in the order they reserved a slot.

use std::sync::Mutex;
use std::time::Duration;

use kubelink_config::constants::MIN_PROXY_QPS;
use tokio::time::Instant;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// Client-side rate limiter shared by the requests of one proxy.
#[derive(Debug)]
pub struct RequestThrottle {
    qps: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RequestThrottle {
    /// Create a throttle that starts with a full bucket.
    ///
    /// `qps` below [`MIN_PROXY_QPS`] (or not a number) and `burst` below 1
    /// are clamped.
    pub fn new(qps: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            qps: if qps >= MIN_PROXY_QPS { qps } else { MIN_PROXY_QPS },
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last: Instant::now(),
            }),
        }
    }

    /// Wait until a request may proceed.
    pub async fn acquire(&self) {
        if let Some(wait) = self.reserve() {
            tokio::time::sleep(wait).await;
        }
    }

    fn reserve(&self) -> Option<Duration> {
        let mut bucket = self
            .bucket
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        let now = Instant::now();
        let elapsed = now.saturating_duration_since(bucket.last).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.qps).min(self.burst);
        bucket.last = now;
        bucket.tokens -= 1.0;

        (bucket.tokens < 0.0)
            .then(|| Duration::try_from_secs_f64(-bucket.tokens / self.qps).unwrap_or(Duration::MAX))
    }
}
