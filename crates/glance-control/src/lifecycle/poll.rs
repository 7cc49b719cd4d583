//! Bounded poll loops with fixed sleep granularity.

use std::thread;
use std::time::Duration;

/// A fixed number of probe attempts separated by a constant sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PollBudget {
    attempts: u32,
    interval: Duration,
}

impl PollBudget {
    pub(crate) const fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Covers `window` with probes spaced `interval` apart, rounding up.
    pub(crate) fn within(window: Duration, interval: Duration) -> Self {
        let step = interval.as_millis().max(1);
        let attempts = u32::try_from(window.as_millis().div_ceil(step)).unwrap_or(u32::MAX);
        Self::new(attempts, interval)
    }

    #[cfg(test)]
    pub(crate) const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Upper bound on the time the loop can spend sleeping.
    pub(crate) const fn ceiling(&self) -> Duration {
        self.interval.saturating_mul(self.attempts)
    }

    /// Runs `probe` until it yields a value or the attempts are spent.
    ///
    /// Each attempt probes first and sleeps afterwards. Errors from the probe
    /// end the loop immediately.
    pub(crate) fn run<T, E>(
        &self,
        mut probe: impl FnMut() -> Result<Option<T>, E>,
    ) -> Result<Option<T>, E> {
        for _ in 0..self.attempts {
            if let Some(value) = probe()? {
                return Ok(Some(value));
            }
            thread::sleep(self.interval);
        }
        Ok(None)
    }
}
