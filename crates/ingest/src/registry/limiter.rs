//! Process-wide concurrency limiter for provider calls.
//!
//! A counting permit pool shared by every fetch task. Permits are RAII
//! guards: dropping one (for example when a provider call times out and its
//! future is dropped) returns it to the pool.

use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Default pool size when none is configured.
pub const DEFAULT_MAX_CONCURRENCY: usize = 5;

/// Bounds how many provider calls run at once.
///
/// Cloning is cheap and every clone shares the same pool. Waiters are served
/// in FIFO order by the underlying semaphore.
#[derive(Clone, Debug)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
}

/// A held permit. Returned to the pool on drop.
#[derive(Debug)]
pub struct ConcurrencyPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyPermit {
    /// Return the permit explicitly.
    pub fn release(self) {}
}

impl ConcurrencyLimiter {
    /// Create a pool with `max_concurrency` permits (at least one).
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
        }
    }

    /// Wait until a permit is free.
    ///
    /// This is the only unbounded wait in the fetch path.
    pub async fn acquire(&self) -> Result<ConcurrencyPermit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        debug!(
            available = self.semaphore.available_permits(),
            "Concurrency limiter: acquired permit"
        );
        Ok(ConcurrencyPermit { _permit: permit })
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<ConcurrencyPermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| ConcurrencyPermit { _permit: permit })
    }

    /// Permits currently free.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }
}

impl Default for ConcurrencyLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENCY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_try_acquire_respects_pool_size() {
        let limiter = ConcurrencyLimiter::new(2);

        let first = limiter.try_acquire();
        let second = limiter.try_acquire();
        assert!(first.is_some());
        assert!(second.is_some());
        assert!(limiter.try_acquire().is_none());
        assert_eq!(limiter.available(), 0);
    }

    #[test]
    fn test_release_returns_permit() {
        let limiter = ConcurrencyLimiter::new(1);

        let permit = limiter.try_acquire().unwrap();
        assert!(limiter.try_acquire().is_none());

        permit.release();
        assert_eq!(limiter.available(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let limiter = ConcurrencyLimiter::new(0);
        assert_eq!(limiter.max_concurrency(), 1);
        assert!(limiter.try_acquire().is_some());
    }

    #[test]
    fn test_clones_share_pool() {
        let limiter = ConcurrencyLimiter::new(1);
        let clone = limiter.clone();

        let _permit = limiter.try_acquire().unwrap();
        assert!(clone.try_acquire().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_holders_never_exceed_pool() {
        let limiter = ConcurrencyLimiter::new(3);
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let limiter = limiter.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _permit = limiter.acquire().await.unwrap();
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 3);
        assert_eq!(limiter.available(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_releases_permit() {
        let limiter = ConcurrencyLimiter::new(1);

        let result = tokio::time::timeout(Duration::from_secs(1), async {
            let _permit = limiter.acquire().await.unwrap();
            std::future::pending::<()>().await;
        })
        .await;

        assert!(result.is_err());
        assert_eq!(limiter.available(), 1);
    }
}
