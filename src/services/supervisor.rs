//! Caller-level retry policy: re-check an unhealthy backend with exponential backoff.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::monitor::HealthMonitor;

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
/// Smallest delay a [`Backoff`] ever returns.
pub const MIN_DELAY: Duration = Duration::from_millis(10);

/// Doubling retry delay capped at a maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    /// Start at `initial` and never exceed `max` (a `max` below `initial` is raised to it).
    ///
    /// `initial` is raised to [`MIN_DELAY`] so retries never spin.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.max(MIN_DELAY);
        Self {
            initial,
            max: max.max(initial),
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns twice as much, up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    /// Go back to the initial delay.
    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, MAX_DELAY)
    }
}

/// Check the backend forever, retrying with exponential backoff while it is unhealthy.
///
/// A healthy backend is re-checked every `healthy_interval`. Cancel by dropping the future.
pub async fn run(monitor: &HealthMonitor, healthy_interval: Duration, mut backoff: Backoff) {
    let mut failures: u32 = 0;

    loop {
        monitor.check_health().await;

        if monitor.is_healthy() {
            if failures > 0 {
                info!(failures, "backend recovered; resetting backoff");
            }
            failures = 0;
            backoff.reset();
            sleep(healthy_interval).await;
        } else {
            let delay = backoff.next_delay();
            failures += 1;
            warn!(
                failures,
                retry_in_ms = delay.as_millis() as u64,
                error = monitor.last_error().as_deref().unwrap_or("backend not healthy"),
                "backend unhealthy; backing off"
            );
            sleep(delay).await;
        }
    }
}
