use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::model::activity::{ActivityBucket, minute_bucket, window_start};
use crate::model::slowmode::{ChannelConfig, ChannelConfigPatch, GuildConfig, GuildConfigPatch};
use crate::store::{ActivityStore, ConfigStore};

#[derive(Debug, Default)]
struct MemoryState {
    guilds: BTreeMap<u64, GuildConfig>,
    channels: BTreeMap<u64, ChannelConfig>,
    activity: BTreeMap<(u64, u64), u64>,
}

impl MemoryState {
    fn guild_entry(&mut self, guild_id: u64) -> &mut GuildConfig {
        self.guilds
            .entry(guild_id)
            .or_insert_with(|| GuildConfig::with_defaults(guild_id))
    }
}

/// Process-local store with the same contracts as the Postgres-backed
/// `Database`. State lives as long as the last clone.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored bucket, ordered by channel then minute.
    pub async fn buckets(&self) -> Vec<ActivityBucket> {
        let state = self.state.read().await;
        state
            .activity
            .iter()
            .map(|(&(channel_id, minute_timestamp), &count)| ActivityBucket {
                channel_id,
                minute_timestamp,
                count,
            })
            .collect()
    }
}

impl ConfigStore for MemoryStore {
    async fn guild_config(&self, guild_id: u64) -> anyhow::Result<GuildConfig> {
        let mut state = self.state.write().await;
        Ok(state.guild_entry(guild_id).clone())
    }

    async fn channel_config(&self, channel_id: u64, guild_id: u64) -> anyhow::Result<ChannelConfig> {
        let mut state = self.state.write().await;
        state.guild_entry(guild_id);

        let channel = state
            .channels
            .entry(channel_id)
            .or_insert_with(|| ChannelConfig::with_defaults(channel_id, guild_id));

        Ok(channel.clone())
    }

    async fn update_guild_config(
        &self,
        guild_id: u64,
        patch: &GuildConfigPatch,
    ) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        if let Some(guild) = state.guilds.get_mut(&guild_id) {
            patch.apply(guild);
        }

        Ok(())
    }

    async fn update_channel_config(
        &self,
        channel_id: u64,
        patch: &ChannelConfigPatch,
    ) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        if let Some(channel) = state.channels.get_mut(&channel_id) {
            patch.apply(channel);
        }

        Ok(())
    }

    async fn list_enabled_guilds(&self) -> anyhow::Result<Vec<GuildConfig>> {
        let state = self.state.read().await;

        Ok(state
            .guilds
            .values()
            .filter(|guild| {
                guild.enabled
                    || state
                        .channels
                        .values()
                        .any(|channel| channel.guild_id == guild.guild_id && channel.enabled)
            })
            .cloned()
            .collect())
    }

    async fn list_enabled_channels(&self, guild_id: u64) -> anyhow::Result<Vec<ChannelConfig>> {
        let state = self.state.read().await;

        Ok(state
            .channels
            .values()
            .filter(|channel| channel.guild_id == guild_id && channel.enabled)
            .cloned()
            .collect())
    }
}

impl ActivityStore for MemoryStore {
    async fn record_message(&self, channel_id: u64, unix_timestamp: u64) -> anyhow::Result<()> {
        let mut state = self.state.write().await;
        *state
            .activity
            .entry((channel_id, minute_bucket(unix_timestamp)))
            .or_insert(0) += 1;

        Ok(())
    }

    async fn windowed_count(
        &self,
        channel_id: u64,
        window_seconds: u64,
        now: u64,
    ) -> anyhow::Result<u64> {
        let since = window_start(now, window_seconds);
        let state = self.state.read().await;

        Ok(state
            .activity
            .range((channel_id, since)..=(channel_id, u64::MAX))
            .map(|(_, count)| *count)
            .sum())
    }

    async fn prune(&self, max_age_seconds: u64, now: u64) -> anyhow::Result<u64> {
        let cutoff = window_start(now, max_age_seconds);
        let mut state = self.state.write().await;

        let before = state.activity.len();
        state.activity.retain(|&(_, minute), _| minute >= cutoff);

        Ok((before - state.activity.len()) as u64)
    }
}
