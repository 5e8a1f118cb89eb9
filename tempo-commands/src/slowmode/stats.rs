use std::time::Instant;

use tracing::warn;

use tempo_core::{Context, Error};
use tempo_database::impls::activity::windowed_count;
use tempo_database::impls::slowmode_config::{get_channel_config, get_guild_config};
use tempo_slowmode::{ChannelRemote, SerenityRemote};
use tempo_utils::embed::{POSITIVE_COLOR, RESTRICTIVE_COLOR, WARNING_COLOR, status_embed};
use tempo_utils::time::now_unix_secs;

use crate::CommandMeta;
use crate::slowmode::embeds::{
    ChannelStats, guild_only_message, invalid_channel_message, not_tracked_description,
};
use crate::slowmode::resolve_target_channel;

pub const META: CommandMeta = CommandMeta {
    name: "slowmodestats",
    desc: "Show activity and slowmode statistics for a channel.",
    category: "slowmode",
    usage: "!slowmodestats [#channel]",
};

const STATS_TITLE: &str = "Auto Slowmode Statistics";

#[poise::command(
    prefix_command,
    slash_command,
    category = "Slowmode",
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    default_member_permissions = "MANAGE_CHANNELS"
)]
pub async fn slowmodestats(
    ctx: Context<'_>,
    #[description = "Channel mention or id"] channel: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let Some(channel_id) = resolve_target_channel(ctx, guild_id, channel.as_deref()).await? else {
        ctx.say(invalid_channel_message()).await?;
        return Ok(());
    };

    let data = ctx.data();
    let guild = get_guild_config(&data.db, guild_id.get()).await?;
    let config = get_channel_config(&data.db, channel_id.get(), guild_id.get()).await?;

    if !config.enabled {
        let embed = status_embed(
            STATS_TITLE,
            not_tracked_description(channel_id.get()),
            RESTRICTIVE_COLOR,
        );
        ctx.send(poise::CreateReply::default().embed(embed)).await?;
        return Ok(());
    }

    let now = now_unix_secs();
    let last_minute = windowed_count(&data.db, channel_id.get(), 60, now).await?;
    let last_five_minutes = windowed_count(&data.db, channel_id.get(), 300, now).await?;
    let last_fifteen_minutes = windowed_count(&data.db, channel_id.get(), 900, now).await?;

    let live_rate = data.ingestor.tracker().rate(
        channel_id.get(),
        data.settings.rate_window,
        Instant::now(),
    );

    let remote = SerenityRemote::new(ctx.serenity_context().http.clone());
    let slowmode_seconds = match remote.fetch_channel(channel_id.get()).await {
        Ok(channel) => Some(channel.slowmode_seconds),
        Err(source) => {
            warn!(%source, channel_id = channel_id.get(), "failed to fetch channel for stats");
            None
        }
    };

    let stats = ChannelStats {
        channel_id: channel_id.get(),
        guild_enabled: guild.enabled,
        threshold: config.effective_threshold(&guild),
        live_rate,
        last_minute,
        last_five_minutes,
        last_fifteen_minutes,
        slowmode_seconds,
    };

    let color = if stats.guild_enabled {
        POSITIVE_COLOR
    } else {
        WARNING_COLOR
    };
    let embed = status_embed(STATS_TITLE, stats.description(), color);

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
