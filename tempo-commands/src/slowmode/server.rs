use poise::serenity_prelude as serenity;
use tracing::info;

use tempo_core::{Context, Error};
use tempo_database::Database;
use tempo_database::impls::slowmode_config::{
    get_channel_config, get_guild_config, update_channel_config, update_guild_config,
};
use tempo_database::model::slowmode::{ChannelConfigPatch, GuildConfigPatch};
use tempo_utils::embed::{POSITIVE_COLOR, RESTRICTIVE_COLOR, status_embed};
use tempo_utils::parse::parse_threshold;

use crate::CommandMeta;
use crate::slowmode::embeds::{guild_only_message, invalid_threshold_message};

pub const META: CommandMeta = CommandMeta {
    name: "slowmodeserver",
    desc: "Enable or disable auto-slowmode server-wide, or set the default threshold.",
    category: "slowmode",
    usage: "!slowmodeserver <enable|disable|threshold <n>>",
};

#[poise::command(
    prefix_command,
    slash_command,
    category = "Slowmode",
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    default_member_permissions = "MANAGE_CHANNELS"
)]
pub async fn slowmodeserver(
    ctx: Context<'_>,
    #[description = "enable, disable or threshold"] action: String,
    #[description = "Threshold in messages per minute"] value: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let db = &ctx.data().db;

    let embed = match action.trim().to_ascii_lowercase().as_str() {
        "enable" | "on" => {
            let channels = set_guild_enabled(ctx, db, guild_id, true).await?;
            status_embed(
                "Auto Slowmode Enabled",
                format!(
                    "Auto-slowmode has been enabled server-wide ({channels} text channels)."
                ),
                POSITIVE_COLOR,
            )
        }
        "disable" | "off" => {
            let channels = set_guild_enabled(ctx, db, guild_id, false).await?;
            status_embed(
                "Auto Slowmode Disabled",
                format!(
                    "Auto-slowmode has been disabled server-wide ({channels} text channels)."
                ),
                RESTRICTIVE_COLOR,
            )
        }
        "threshold" => {
            let Some(threshold) = value.as_deref().and_then(parse_threshold) else {
                ctx.say(invalid_threshold_message()).await?;
                return Ok(());
            };

            get_guild_config(db, guild_id.get()).await?;
            update_guild_config(
                db,
                guild_id.get(),
                &GuildConfigPatch::default_threshold(threshold),
            )
            .await?;
            info!(
                guild_id = guild_id.get(),
                threshold,
                user_id = ctx.author().id.get(),
                "auto-slowmode default threshold set"
            );

            status_embed(
                "Auto Slowmode Threshold Set",
                format!(
                    "The server default threshold is now {threshold} messages per minute. \
                     Channels with their own threshold keep it."
                ),
                POSITIVE_COLOR,
            )
        }
        _ => {
            ctx.say(format!("Usage: `{}`", META.usage)).await?;
            return Ok(());
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Flip the guild flag and every text channel's flag. Returns how many
/// channels were updated.
async fn set_guild_enabled(
    ctx: Context<'_>,
    db: &Database,
    guild_id: serenity::GuildId,
    enabled: bool,
) -> Result<usize, Error> {
    get_guild_config(db, guild_id.get()).await?;
    update_guild_config(db, guild_id.get(), &GuildConfigPatch::enabled(enabled)).await?;

    let channels = guild_id.channels(ctx.http()).await?;
    let mut updated = 0;
    for channel in channels
        .values()
        .filter(|channel| channel.kind == serenity::ChannelType::Text)
    {
        get_channel_config(db, channel.id.get(), guild_id.get()).await?;
        update_channel_config(db, channel.id.get(), &ChannelConfigPatch::enabled(enabled))
            .await?;
        updated += 1;
    }

    info!(
        guild_id = guild_id.get(),
        enabled,
        channels = updated,
        user_id = ctx.author().id.get(),
        "auto-slowmode toggled server-wide"
    );

    Ok(updated)
}
