//! Reconnect and health-check timing.

use std::time::Duration;

/// Shortest health-check period the supervisor will run with.
pub const MIN_HEALTH_PERIOD: Duration = Duration::from_millis(1);

/// Timing knobs of the supervisor task.
///
/// Delay for attempt `n` (1-based) is `base_delay * 2^(n-1)`, capped at
/// `max_delay`. No jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Period of the liveness check while connected.
    pub health_interval: Duration,
    /// How long a health-check ping may take.
    pub health_timeout: Duration,
    /// How long the ping on a freshly reconnected session may take.
    pub probe_timeout: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            health_interval: Duration::from_secs(5),
            health_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << shift)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }

    /// `health_interval`, raised to [`MIN_HEALTH_PERIOD`] when zero.
    pub fn health_period(&self) -> Duration {
        self.health_interval.max(MIN_HEALTH_PERIOD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doubles_then_caps() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=6).map(|n| policy.delay_for_attempt(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 30]);
    }

    #[test]
    fn huge_attempt_counts_saturate() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_secs(30));
        assert_eq!(policy.delay_for_attempt(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn zero_health_interval_is_clamped() {
        let policy = ReconnectPolicy { health_interval: Duration::ZERO, ..ReconnectPolicy::default() };
        assert_eq!(policy.health_period(), MIN_HEALTH_PERIOD);
        assert_eq!(ReconnectPolicy::default().health_period(), Duration::from_secs(5));
    }
}
