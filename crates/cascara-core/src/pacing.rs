use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

/// Inter-request delay window. A fresh delay is sampled uniformly from
/// `[min, max]` before each URL to avoid a regular request rhythm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    pub min: Duration,
    pub max: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(1_000),
            max: Duration::from_millis(3_000),
        }
    }
}

impl PacingConfig {
    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min: Duration::from_millis(min_ms),
            max: Duration::from_millis(max_ms.max(min_ms)),
        }
    }

    /// No delay between requests.
    pub fn disabled() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let millis = rand::rng().random_range(self.min.as_millis()..=self.max.as_millis());
        Duration::from_millis(millis as u64)
    }

    /// Sleeps for a sampled delay, returning early if `cancel` trips so
    /// stop requests are not held up by pacing.
    pub async fn pause(&self, cancel: &CancellationToken) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel.cancelled() => {}
        }
    }
}
