use anyhow::Context as _;

use crate::database::Database;
use crate::model::activity::{minute_bucket, window_start};

/// Count one message into the minute bucket containing `unix_timestamp`.
pub async fn record_message(
    db: &Database,
    channel_id: u64,
    unix_timestamp: u64,
) -> anyhow::Result<()> {
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;
    let minute_i64 =
        i64::try_from(minute_bucket(unix_timestamp)).context("timestamp out of i64 range")?;

    sqlx::query(
        "INSERT INTO channel_activity (channel_id, minute_ts, message_count) \
         VALUES ($1, $2, 1) \
         ON CONFLICT (channel_id, minute_ts) \
         DO UPDATE SET message_count = channel_activity.message_count + 1",
    )
    .bind(channel_id_i64)
    .bind(minute_i64)
    .execute(db.pool())
    .await?;

    Ok(())
}

/// Sum of bucket counts whose minute starts at or after `now - window_seconds`.
pub async fn windowed_count(
    db: &Database,
    channel_id: u64,
    window_seconds: u64,
    now: u64,
) -> anyhow::Result<u64> {
    let channel_id_i64 = i64::try_from(channel_id).context("channel_id out of i64 range")?;
    let since = i64::try_from(window_start(now, window_seconds)).context("window out of range")?;

    let total: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(message_count), 0)::BIGINT FROM channel_activity \
         WHERE channel_id = $1 AND minute_ts >= $2",
    )
    .bind(channel_id_i64)
    .bind(since)
    .fetch_one(db.pool())
    .await?;

    u64::try_from(total).context("activity total out of u64 range")
}

/// Delete buckets older than `now - max_age_seconds`. Returns the number removed.
pub async fn prune_activity(
    db: &Database,
    max_age_seconds: u64,
    now: u64,
) -> anyhow::Result<u64> {
    let cutoff = i64::try_from(window_start(now, max_age_seconds)).context("cutoff out of range")?;

    let result = sqlx::query("DELETE FROM channel_activity WHERE minute_ts < $1")
        .bind(cutoff)
        .execute(db.pool())
        .await?;

    Ok(result.rows_affected())
}
