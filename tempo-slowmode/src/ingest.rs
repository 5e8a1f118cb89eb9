use std::time::Instant;

use anyhow::Context;

use tempo_database::ActivityStore;

use crate::tracker::RateTracker;

/// Platform-neutral view of a newly created message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InboundMessage {
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    /// False for bots, system messages and webhooks.
    pub from_human: bool,
    pub unix_timestamp: u64,
}

/// Feeds message arrivals into the in-memory tracker and the durable buckets.
#[derive(Clone, Debug)]
pub struct Ingestor<A> {
    activity: A,
    tracker: RateTracker,
}

impl<A: ActivityStore> Ingestor<A> {
    pub fn new(activity: A, tracker: RateTracker) -> Self {
        Self { activity, tracker }
    }

    pub fn tracker(&self) -> &RateTracker {
        &self.tracker
    }

    pub fn activity(&self) -> &A {
        &self.activity
    }

    /// Count one message. Returns `false` when it was ignored. The tracker is
    /// updated before the durable write, so a failed write still leaves the
    /// live rate correct.
    pub async fn observe(
        &self,
        message: &InboundMessage,
        arrived: Instant,
    ) -> anyhow::Result<bool> {
        if !message.from_human || message.guild_id.is_none() {
            return Ok(false);
        }

        self.tracker.record(message.channel_id, arrived);
        self.activity
            .record_message(message.channel_id, message.unix_timestamp)
            .await
            .with_context(|| {
                format!("failed to record activity for channel {}", message.channel_id)
            })?;

        Ok(true)
    }
}
