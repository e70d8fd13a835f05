//! Fetcher-wide rate-limit cooldown.
//!
//! When the provider signals throttling, every task sharing the gate stops
//! issuing calls until the cooldown has elapsed. Overlapping trips extend the
//! pause to the latest deadline; they never stack.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Default pause after a rate-limit signal.
pub const DEFAULT_RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(120);

/// Shared pause switch consulted before every provider call.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    resume_at: Mutex<Option<Instant>>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the deadline, recovering from poison if necessary.
    fn lock_deadline(&self) -> MutexGuard<'_, Option<Instant>> {
        self.resume_at.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limit gate mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Close the gate for `cooldown` from now. Returns the resulting deadline.
    pub fn trip(&self, cooldown: Duration) -> Instant {
        let candidate = Instant::now() + cooldown;
        let mut deadline = self.lock_deadline();
        let resume_at = match *deadline {
            Some(existing) if existing >= candidate => existing,
            _ => candidate,
        };
        *deadline = Some(resume_at);
        resume_at
    }

    /// Time left until the gate opens, if it is closed.
    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        let mut deadline = self.lock_deadline();
        match *deadline {
            Some(resume_at) if resume_at > now => Some(resume_at - now),
            Some(_) => {
                *deadline = None;
                None
            }
            None => None,
        }
    }

    pub fn is_cooling_down(&self) -> bool {
        self.remaining().is_some()
    }

    /// Suspend until the gate is open.
    ///
    /// Re-checks after waking because another task may have extended the
    /// deadline in the meantime.
    pub async fn wait(&self) {
        while let Some(left) = self.remaining() {
            debug!(wait_secs = left.as_secs_f64(), "Rate limit gate closed, waiting");
            tokio::time::sleep(left).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_open_gate_does_not_wait() {
        let gate = RateLimitGate::new();
        let start = Instant::now();
        gate.wait().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!gate.is_cooling_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_trip_blocks_for_cooldown() {
        let gate = RateLimitGate::new();
        let start = Instant::now();

        gate.trip(Duration::from_secs(120));
        assert!(gate.is_cooling_down());

        gate.wait().await;
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert!(!gate.is_cooling_down());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_trips_do_not_stack() {
        let gate = RateLimitGate::new();
        let start = Instant::now();

        let first = gate.trip(Duration::from_secs(120));
        let second = gate.trip(Duration::from_secs(60));
        assert_eq!(first, second);

        gate.wait().await;
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(120));
        assert!(elapsed < Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_waiters_are_held() {
        let gate = Arc::new(RateLimitGate::new());
        gate.trip(Duration::from_secs(30));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.wait().await;
                Instant::now()
            }));
        }
        for handle in handles {
            let released = handle.await.unwrap();
            assert!(released - start >= Duration::from_secs(30));
        }
    }
}
