pub mod channel;
pub mod embeds;
pub mod server;
pub mod stats;

use poise::serenity_prelude as serenity;

use tempo_core::{Context, Error};
use tempo_utils::parse::parse_channel_id;

/// Resolve the channel a slowmode command targets: the invoking channel when
/// `raw` is absent, otherwise a mentioned or raw-id text channel that belongs
/// to `guild_id`. `None` means the argument did not name such a channel.
pub(crate) async fn resolve_target_channel(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    raw: Option<&str>,
) -> Result<Option<serenity::ChannelId>, Error> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Some(ctx.channel_id()));
    };

    let Some(channel_id) = parse_channel_id(raw).map(serenity::ChannelId::new) else {
        return Ok(None);
    };

    let channel = match channel_id.to_channel(ctx).await {
        Ok(channel) => channel,
        Err(serenity::Error::Http(_)) => return Ok(None),
        Err(source) => return Err(source.into()),
    };

    Ok(channel
        .guild()
        .filter(|channel| {
            channel.guild_id == guild_id && channel.kind == serenity::ChannelType::Text
        })
        .map(|channel| channel.id))
}
