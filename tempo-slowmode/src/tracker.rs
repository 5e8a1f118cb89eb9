use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// In-memory sliding window of message arrivals per channel.
///
/// Cheap to clone; every clone shares the same windows. Advisory only: it is
/// empty after a restart and the durable activity buckets take over.
#[derive(Clone, Debug, Default)]
pub struct RateTracker {
    windows: Arc<Mutex<HashMap<u64, VecDeque<Instant>>>>,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, channel_id: u64, at: Instant) {
        self.windows.lock().entry(channel_id).or_default().push_back(at);
    }

    /// Messages per minute over the last `window`, scaled as
    /// `count * 60 / window_seconds`. Evicts arrivals that fell out of the
    /// window; unknown channels report `0.0`.
    pub fn rate(&self, channel_id: u64, window: Duration, now: Instant) -> f64 {
        if window.is_zero() {
            return 0.0;
        }

        let mut windows = self.windows.lock();
        let Some(arrivals) = windows.get_mut(&channel_id) else {
            return 0.0;
        };

        evict(arrivals, now.checked_sub(window));
        let count = arrivals.len();
        if count == 0 {
            windows.remove(&channel_id);
            return 0.0;
        }

        count as f64 * 60.0 / window.as_secs_f64()
    }

    /// Evict stale arrivals across every channel and forget channels left
    /// empty. Returns how many channels were forgotten.
    pub fn sweep(&self, window: Duration, now: Instant) -> usize {
        let cutoff = now.checked_sub(window);
        let mut windows = self.windows.lock();
        let before = windows.len();

        windows.retain(|_, arrivals| {
            evict(arrivals, cutoff);
            !arrivals.is_empty()
        });

        before - windows.len()
    }

    pub fn tracked_channels(&self) -> usize {
        self.windows.lock().len()
    }
}

// Concurrent writers may push slightly out of order, so filter the whole
// deque instead of popping from the front.
fn evict(arrivals: &mut VecDeque<Instant>, cutoff: Option<Instant>) {
    if let Some(cutoff) = cutoff {
        arrivals.retain(|at| *at > cutoff);
    }
}
