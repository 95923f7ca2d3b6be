//! Shared rate limiting for enrichment lookups.
//!
//! Two limits apply at once: a counting semaphore caps how many lookups run
//! concurrently, and a `governor` quota spaces out request starts so search
//! backends are not hammered.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

type Pacer = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Concurrency cap plus request pacing. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RateLimiter {
    permits: Arc<Semaphore>,
    pacer: Option<Arc<Pacer>>,
    workers: usize,
}

impl RateLimiter {
    /// At most `workers` concurrent lookups, one start per `delay`.
    /// A zero delay disables pacing.
    pub fn new(workers: usize, delay: Duration) -> Self {
        let workers = workers.max(1);
        let pacer = Quota::with_period(delay)
            .map(|q| q.allow_burst(NonZeroU32::MIN))
            .map(|q| Arc::new(GovRateLimiter::direct(q)));
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            pacer,
            workers,
        }
    }

    /// Wait for a worker slot and then for the pacing quota.
    ///
    /// The slot is held until the returned permit is dropped.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("rate limiter semaphore closed");
        if let Some(pacer) = &self.pacer {
            pacer.until_ready().await;
        }
        permit
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_paced(&self) -> bool {
        self.pacer.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[test]
    fn zero_workers_becomes_one() {
        let limiter = RateLimiter::new(0, Duration::ZERO);
        assert_eq!(limiter.workers(), 1);
        assert!(!limiter.is_paced());
    }

    #[tokio::test]
    async fn caps_concurrency() {
        let limiter = RateLimiter::new(2, Duration::ZERO);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire().await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for h in handles {
            h.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn paces_request_starts() {
        let limiter = RateLimiter::new(4, Duration::from_millis(50));
        assert!(limiter.is_paced());

        let start = Instant::now();
        for _ in 0..3 {
            drop(limiter.acquire().await);
        }
        // First start is immediate, the next two wait one period each.
        assert!(start.elapsed() >= Duration::from_millis(90));
    }
}
