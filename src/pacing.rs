//! Fixed delay between consecutive analytics API calls.

use std::time::Duration;
use tracing::debug;

/// Spaces out API calls to stay under the upstream rate limit.
///
/// The first call goes out immediately; every later call waits `interval`.
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    calls: usize,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, calls: 0 }
    }

    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// A pacer that never sleeps.
    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of calls let through so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    /// Waits until the next call may be issued.
    pub async fn wait_turn(&mut self) {
        if self.calls > 0 && !self.interval.is_zero() {
            debug!(sleep_secs = self.interval.as_secs_f64(), "Pacing before next API call");
            tokio::time::sleep(self.interval).await;
        }
        self.calls += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn test_first_call_is_not_delayed() {
        let mut pacer = Pacer::new(Duration::from_secs(5));
        let start = Instant::now();
        pacer.wait_turn().await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(pacer.calls(), 1);
    }

    #[tokio::test]
    async fn test_later_calls_wait_interval() {
        let mut pacer = Pacer::new(Duration::from_millis(40));
        let start = Instant::now();
        for _ in 0..3 {
            pacer.wait_turn().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(pacer.calls(), 3);
    }

    #[tokio::test]
    async fn test_unpaced_counts_calls() {
        let mut pacer = Pacer::unpaced();
        pacer.wait_turn().await;
        pacer.wait_turn().await;
        assert_eq!(pacer.calls(), 2);
        assert!(pacer.interval().is_zero());
    }
}
