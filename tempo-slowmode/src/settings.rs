use std::time::Duration;

use rand::Rng;

/// Tunables for the reconciliation loop, ingestion, and pruning.
#[derive(Clone, Debug, PartialEq)]
pub struct SlowmodeSettings {
    /// Delay between reconciliation cycles.
    pub interval: Duration,
    /// How long durable activity buckets are kept.
    pub retention: Duration,
    /// Cadence of the retention prune job.
    pub prune_interval: Duration,
    /// Sliding window used by the in-memory rate estimate.
    pub rate_window: Duration,
    /// Durable window consulted by the idle short-circuit.
    pub idle_window: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    /// Upper bound on any single remote call.
    pub call_timeout: Duration,
    /// Upper bound on waiting for the in-flight cycle at shutdown.
    pub drain_timeout: Duration,
    /// Post a notice in the channel after each applied change.
    pub notify: bool,
}

impl Default for SlowmodeSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            retention: Duration::from_secs(86_400),
            prune_interval: Duration::from_secs(3_600),
            rate_window: Duration::from_secs(60),
            idle_window: Duration::from_secs(300),
            jitter_min: Duration::from_millis(100),
            jitter_max: Duration::from_millis(2_000),
            call_timeout: Duration::from_secs(10),
            drain_timeout: Duration::from_secs(15),
            notify: true,
        }
    }
}

impl SlowmodeSettings {
    /// Uniform delay in `jitter_min..=jitter_max`. Inverted bounds collapse to
    /// `jitter_min`.
    pub fn jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }

        rand::thread_rng().gen_range(self.jitter_min..=self.jitter_max)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::SlowmodeSettings;

    #[test]
    fn defaults_match_documented_values() {
        let settings = SlowmodeSettings::default();
        assert_eq!(settings.interval, Duration::from_secs(30));
        assert_eq!(settings.retention, Duration::from_secs(24 * 60 * 60));
        assert_eq!(settings.rate_window, Duration::from_secs(60));
        assert_eq!(settings.jitter_min, Duration::from_millis(100));
        assert_eq!(settings.jitter_max, Duration::from_secs(2));
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let settings = SlowmodeSettings::default();
        for _ in 0..200 {
            let jitter = settings.jitter();
            assert!(jitter >= settings.jitter_min && jitter <= settings.jitter_max);
        }
    }

    #[test]
    fn degenerate_jitter_is_fixed() {
        let settings = SlowmodeSettings {
            jitter_min: Duration::ZERO,
            jitter_max: Duration::ZERO,
            ..SlowmodeSettings::default()
        };
        assert_eq!(settings.jitter(), Duration::ZERO);
    }
}
