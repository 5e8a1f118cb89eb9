/// Width of one durable activity bucket.
pub const BUCKET_SECONDS: u64 = 60;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivityBucket {
    pub channel_id: u64,
    /// Unix seconds rounded down to the minute.
    pub minute_timestamp: u64,
    pub count: u64,
}

/// Round a unix timestamp down to the start of its minute bucket.
pub fn minute_bucket(unix_timestamp: u64) -> u64 {
    unix_timestamp / BUCKET_SECONDS * BUCKET_SECONDS
}

/// First unix second still inside a window of `window_seconds` ending at `now`.
pub fn window_start(now: u64, window_seconds: u64) -> u64 {
    now.saturating_sub(window_seconds)
}
