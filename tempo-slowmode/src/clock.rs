use std::time::Instant;

use tempo_utils::time::now_unix_secs;

/// Time source for the loop. Wall-clock seconds key the durable buckets,
/// monotonic instants key the in-memory tracker.
pub trait Clock: Send + Sync {
    fn unix_now(&self) -> u64;

    fn instant_now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_now(&self) -> u64 {
        now_unix_secs()
    }

    fn instant_now(&self) -> Instant {
        Instant::now()
    }
}
