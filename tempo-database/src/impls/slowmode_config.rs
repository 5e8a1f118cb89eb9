use anyhow::Context as _;

use crate::cache::{
    CONFIG_CACHE_TTL, channel_config_key, guild_config_key, invalidate_channel_config,
    invalidate_guild_config,
};
use crate::database::Database;
use crate::model::slowmode::{ChannelConfig, ChannelConfigPatch, GuildConfig, GuildConfigPatch};

type GuildRow = (i64, bool, i32, i32);
type ChannelRow = (i64, i64, bool, Option<i32>);

fn guild_from_row(row: GuildRow) -> anyhow::Result<GuildConfig> {
    let (guild_id, enabled, default_threshold, interval) = row;

    Ok(GuildConfig {
        guild_id: u64::try_from(guild_id).context("guild_id out of u64 range")?,
        enabled,
        default_threshold: u32::try_from(default_threshold)
            .context("default_threshold out of u32 range")?,
        update_interval_seconds: u32::try_from(interval)
            .context("update_interval_seconds out of u32 range")?,
    })
}

fn channel_from_row(row: ChannelRow) -> anyhow::Result<ChannelConfig> {
    let (channel_id, guild_id, enabled, threshold) = row;

    Ok(ChannelConfig {
        channel_id: u64::try_from(channel_id).context("channel_id out of u64 range")?,
        guild_id: u64::try_from(guild_id).context("guild_id out of u64 range")?,
        enabled,
        threshold_override: threshold
            .map(u32::try_from)
            .transpose()
            .context("threshold_override out of u32 range")?,
    })
}

fn optional_i32(value: Option<u32>, field: &str) -> anyhow::Result<Option<i32>> {
    value
        .map(i32::try_from)
        .transpose()
        .with_context(|| format!("{field} out of i32 range"))
}

// ---------------------------------------------------------------------------
// Guild config
// ---------------------------------------------------------------------------

/// Get the guild row, inserting the defaults on first access.
pub async fn get_guild_config(db: &Database, guild_id: u64) -> anyhow::Result<GuildConfig> {
    let cache_key = guild_config_key(db.cache(), guild_id);
    db.cache()
        .get_or_load_json(&cache_key, CONFIG_CACHE_TTL, || {
            load_or_create_guild_config(db, guild_id)
        })
        .await
}

async fn load_or_create_guild_config(
    db: &Database,
    guild_id: u64,
) -> anyhow::Result<GuildConfig> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    sqlx::query(
        "INSERT INTO slowmode_guild_config (guild_id) VALUES ($1) \
         ON CONFLICT (guild_id) DO NOTHING",
    )
    .bind(guild_id_i64)
    .execute(db.pool())
    .await?;

    let row = sqlx::query_as::<_, GuildRow>(
        "SELECT guild_id, enabled, default_threshold, update_interval_seconds \
         FROM slowmode_guild_config WHERE guild_id = $1",
    )
    .bind(guild_id_i64)
    .fetch_one(db.pool())
    .await?;

    guild_from_row(row)
}

/// Apply a partial update to an existing guild row.
pub async fn update_guild_config(
    db: &Database,
    guild_id: u64,
    patch: &GuildConfigPatch,
) -> anyhow::Result<()> {
    if patch.is_empty() {
        return Ok(());
    }

    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;
    let default_threshold = optional_i32(patch.default_threshold, "default_threshold")?;
    let interval = optional_i32(patch.update_interval_seconds, "update_interval_seconds")?;

    sqlx::query(
        "UPDATE slowmode_guild_config SET \
         enabled = COALESCE($2, enabled), \
         default_threshold = COALESCE($3, default_threshold), \
         update_interval_seconds = COALESCE($4, update_interval_seconds) \
         WHERE guild_id = $1",
    )
    .bind(guild_id_i64)
    .bind(patch.enabled)
    .bind(default_threshold)
    .bind(interval)
    .execute(db.pool())
    .await?;

    invalidate_guild_config(db.cache(), guild_id).await;

    Ok(())
}

/// Guilds that participate in reconciliation: the guild itself is enabled, or
/// at least one of its channels is.
pub async fn list_enabled_guilds(db: &Database) -> anyhow::Result<Vec<GuildConfig>> {
    let rows = sqlx::query_as::<_, GuildRow>(
        "SELECT DISTINCT g.guild_id, g.enabled, g.default_threshold, g.update_interval_seconds \
         FROM slowmode_guild_config g \
         LEFT JOIN slowmode_channel_config c ON c.guild_id = g.guild_id \
         WHERE g.enabled OR c.enabled \
         ORDER BY g.guild_id",
    )
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(guild_from_row).collect()
}

// ---------------------------------------------------------------------------
// Channel config
// ---------------------------------------------------------------------------

/// Get the channel row, inserting the defaults (and the owning guild row) on
/// first access.
pub async fn get_channel_config(
    db: &Database,
    channel_id: u64,
    guild_id: u64,
) -> anyhow::Result<ChannelConfig> {
    let cache_key = channel_config_key(db.cache(), channel_id);
    db.cache()
        .get_or_load_json(&cache_key, CONFIG_CACHE_TTL, || {
            load_or_create_channel_config(db, channel_id, guild_id)
        })
        .await
}

async fn load_or_create_channel_config(
    db: &Database,
    channel_id: u64,
    guild_id: u64,
) -> anyhow::Result<ChannelConfig> {
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    sqlx::query(
        "INSERT INTO slowmode_guild_config (guild_id) VALUES ($1) \
         ON CONFLICT (guild_id) DO NOTHING",
    )
    .bind(guild_id_i64)
    .execute(db.pool())
    .await?;

    sqlx::query(
        "INSERT INTO slowmode_channel_config (channel_id, guild_id) VALUES ($1, $2) \
         ON CONFLICT (channel_id) DO NOTHING",
    )
    .bind(channel_id_i64)
    .bind(guild_id_i64)
    .execute(db.pool())
    .await?;

    let row = sqlx::query_as::<_, ChannelRow>(
        "SELECT channel_id, guild_id, enabled, threshold_override \
         FROM slowmode_channel_config WHERE channel_id = $1",
    )
    .bind(channel_id_i64)
    .fetch_one(db.pool())
    .await?;

    channel_from_row(row)
}

/// Apply a partial update to an existing channel row.
pub async fn update_channel_config(
    db: &Database,
    channel_id: u64,
    patch: &ChannelConfigPatch,
) -> anyhow::Result<()> {
    if patch.is_empty() {
        return Ok(());
    }

    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;
    let set_threshold = patch.threshold_override.is_some();
    let threshold = optional_i32(patch.threshold_override.flatten(), "threshold_override")?;

    sqlx::query(
        "UPDATE slowmode_channel_config SET \
         enabled = COALESCE($2, enabled), \
         threshold_override = CASE WHEN $3 THEN $4 ELSE threshold_override END \
         WHERE channel_id = $1",
    )
    .bind(channel_id_i64)
    .bind(patch.enabled)
    .bind(set_threshold)
    .bind(threshold)
    .execute(db.pool())
    .await?;

    invalidate_channel_config(db.cache(), channel_id).await;

    Ok(())
}

pub async fn list_enabled_channels(
    db: &Database,
    guild_id: u64,
) -> anyhow::Result<Vec<ChannelConfig>> {
    let guild_id_i64 = i64::try_from(guild_id).context("guild_id out of i64 range")?;

    let rows = sqlx::query_as::<_, ChannelRow>(
        "SELECT channel_id, guild_id, enabled, threshold_override \
         FROM slowmode_channel_config WHERE guild_id = $1 AND enabled = TRUE \
         ORDER BY channel_id",
    )
    .bind(guild_id_i64)
    .fetch_all(db.pool())
    .await?;

    rows.into_iter().map(channel_from_row).collect()
}
