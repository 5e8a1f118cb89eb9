//! Narrow persistence contracts used by the slowmode loop and ingestion.
//!
//! `Database` implements them against Postgres, `MemoryStore` keeps the same
//! semantics in process memory.

use std::future::Future;

use crate::database::Database;
use crate::impls::{activity, slowmode_config};
use crate::model::slowmode::{ChannelConfig, ChannelConfigPatch, GuildConfig, GuildConfigPatch};

pub trait ConfigStore: Send + Sync {
    /// Get-or-create: never reports absence, a missing row is created with defaults.
    fn guild_config(&self, guild_id: u64)
    -> impl Future<Output = anyhow::Result<GuildConfig>> + Send;

    /// Get-or-create. Also creates the owning guild row when needed.
    fn channel_config(
        &self,
        channel_id: u64,
        guild_id: u64,
    ) -> impl Future<Output = anyhow::Result<ChannelConfig>> + Send;

    fn update_guild_config(
        &self,
        guild_id: u64,
        patch: &GuildConfigPatch,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn update_channel_config(
        &self,
        channel_id: u64,
        patch: &ChannelConfigPatch,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Guilds that are enabled, or that own at least one enabled channel.
    fn list_enabled_guilds(&self) -> impl Future<Output = anyhow::Result<Vec<GuildConfig>>> + Send;

    fn list_enabled_channels(
        &self,
        guild_id: u64,
    ) -> impl Future<Output = anyhow::Result<Vec<ChannelConfig>>> + Send;
}

pub trait ActivityStore: Send + Sync {
    /// Insert-or-increment the minute bucket containing `unix_timestamp`.
    fn record_message(
        &self,
        channel_id: u64,
        unix_timestamp: u64,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn windowed_count(
        &self,
        channel_id: u64,
        window_seconds: u64,
        now: u64,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;

    /// Remove buckets older than `now - max_age_seconds`; returns rows removed.
    fn prune(
        &self,
        max_age_seconds: u64,
        now: u64,
    ) -> impl Future<Output = anyhow::Result<u64>> + Send;
}

impl ConfigStore for Database {
    async fn guild_config(&self, guild_id: u64) -> anyhow::Result<GuildConfig> {
        slowmode_config::get_guild_config(self, guild_id).await
    }

    async fn channel_config(&self, channel_id: u64, guild_id: u64) -> anyhow::Result<ChannelConfig> {
        slowmode_config::get_channel_config(self, channel_id, guild_id).await
    }

    async fn update_guild_config(
        &self,
        guild_id: u64,
        patch: &GuildConfigPatch,
    ) -> anyhow::Result<()> {
        slowmode_config::update_guild_config(self, guild_id, patch).await
    }

    async fn update_channel_config(
        &self,
        channel_id: u64,
        patch: &ChannelConfigPatch,
    ) -> anyhow::Result<()> {
        slowmode_config::update_channel_config(self, channel_id, patch).await
    }

    async fn list_enabled_guilds(&self) -> anyhow::Result<Vec<GuildConfig>> {
        slowmode_config::list_enabled_guilds(self).await
    }

    async fn list_enabled_channels(&self, guild_id: u64) -> anyhow::Result<Vec<ChannelConfig>> {
        slowmode_config::list_enabled_channels(self, guild_id).await
    }
}

impl ActivityStore for Database {
    async fn record_message(&self, channel_id: u64, unix_timestamp: u64) -> anyhow::Result<()> {
        activity::record_message(self, channel_id, unix_timestamp).await
    }

    async fn windowed_count(
        &self,
        channel_id: u64,
        window_seconds: u64,
        now: u64,
    ) -> anyhow::Result<u64> {
        activity::windowed_count(self, channel_id, window_seconds, now).await
    }

    async fn prune(&self, max_age_seconds: u64, now: u64) -> anyhow::Result<u64> {
        activity::prune_activity(self, max_age_seconds, now).await
    }
}
