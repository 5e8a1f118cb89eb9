use tracing::{info, warn};

use tempo_core::{Context, Error};
use tempo_database::impls::slowmode_config::{get_channel_config, update_channel_config};
use tempo_database::model::slowmode::ChannelConfigPatch;
use tempo_slowmode::{ChannelRemote, SerenityRemote};
use tempo_utils::embed::{POSITIVE_COLOR, RESTRICTIVE_COLOR, WARNING_COLOR, status_embed};
use tempo_utils::parse::parse_threshold;

use crate::CommandMeta;
use crate::slowmode::embeds::{
    guild_only_message, invalid_channel_message, invalid_threshold_message,
};
use crate::slowmode::resolve_target_channel;

pub const META: CommandMeta = CommandMeta {
    name: "slowmodechannel",
    desc: "Enable, disable or tune auto-slowmode for a channel.",
    category: "slowmode",
    usage: "!slowmodechannel <enable|disable|threshold <n>|reset> [#channel]",
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChannelAction {
    Enable,
    Disable,
    Threshold(u32),
    Reset,
}

#[derive(Debug, PartialEq, Eq)]
enum ParseError {
    UnknownAction,
    BadThreshold,
}

/// Split `<action> [value] [#channel]` into the action and the optional
/// channel argument.
fn parse_channel_action<'a>(
    action: &str,
    rest: Option<&'a str>,
) -> Result<(ChannelAction, Option<&'a str>), ParseError> {
    let mut tokens = rest.unwrap_or_default().split_whitespace();

    let action = match action.trim().to_ascii_lowercase().as_str() {
        "enable" | "on" => ChannelAction::Enable,
        "disable" | "off" => ChannelAction::Disable,
        "reset" => ChannelAction::Reset,
        "threshold" => {
            let threshold = tokens
                .next()
                .and_then(parse_threshold)
                .ok_or(ParseError::BadThreshold)?;
            ChannelAction::Threshold(threshold)
        }
        _ => return Err(ParseError::UnknownAction),
    };

    Ok((action, tokens.next()))
}

#[poise::command(
    prefix_command,
    slash_command,
    category = "Slowmode",
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    default_member_permissions = "MANAGE_CHANNELS"
)]
pub async fn slowmodechannel(
    ctx: Context<'_>,
    #[description = "enable, disable, threshold or reset"] action: String,
    #[description = "Threshold value and/or channel mention"]
    #[rest]
    args: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        ctx.say(guild_only_message()).await?;
        return Ok(());
    };

    let (action, channel_arg) = match parse_channel_action(&action, args.as_deref()) {
        Ok(parsed) => parsed,
        Err(ParseError::BadThreshold) => {
            ctx.say(invalid_threshold_message()).await?;
            return Ok(());
        }
        Err(ParseError::UnknownAction) => {
            ctx.say(format!("Usage: `{}`", META.usage)).await?;
            return Ok(());
        }
    };

    let Some(channel_id) = resolve_target_channel(ctx, guild_id, channel_arg).await? else {
        ctx.say(invalid_channel_message()).await?;
        return Ok(());
    };

    let db = &ctx.data().db;
    get_channel_config(db, channel_id.get(), guild_id.get()).await?;

    let embed = match action {
        ChannelAction::Enable => {
            update_channel_config(db, channel_id.get(), &ChannelConfigPatch::enabled(true)).await?;
            info!(
                channel_id = channel_id.get(),
                user_id = ctx.author().id.get(),
                "auto-slowmode enabled for channel"
            );
            status_embed(
                "Auto Slowmode Enabled",
                format!("Auto-slowmode has been enabled for <#{channel_id}>."),
                POSITIVE_COLOR,
            )
        }
        ChannelAction::Disable => {
            update_channel_config(db, channel_id.get(), &ChannelConfigPatch::enabled(false))
                .await?;
            info!(
                channel_id = channel_id.get(),
                user_id = ctx.author().id.get(),
                "auto-slowmode disabled for channel"
            );

            let remote = SerenityRemote::new(ctx.serenity_context().http.clone());
            match remote.edit_slowmode(channel_id.get(), 0).await {
                Ok(()) => status_embed(
                    "Auto Slowmode Disabled",
                    format!("Auto-slowmode has been disabled for <#{channel_id}>."),
                    RESTRICTIVE_COLOR,
                ),
                Err(source) => {
                    warn!(%source, channel_id = channel_id.get(), "failed to reset slowmode");
                    status_embed(
                        "Auto Slowmode Disabled",
                        format!(
                            "Auto-slowmode has been disabled for <#{channel_id}>, \
                             but its current slowmode could not be reset."
                        ),
                        WARNING_COLOR,
                    )
                }
            }
        }
        ChannelAction::Threshold(threshold) => {
            update_channel_config(
                db,
                channel_id.get(),
                &ChannelConfigPatch::threshold_override(Some(threshold)),
            )
            .await?;
            info!(
                channel_id = channel_id.get(),
                threshold,
                user_id = ctx.author().id.get(),
                "auto-slowmode threshold set for channel"
            );
            status_embed(
                "Auto Slowmode Threshold Set",
                format!(
                    "Auto-slowmode threshold for <#{channel_id}> has been set to \
                     {threshold} messages per minute."
                ),
                POSITIVE_COLOR,
            )
        }
        ChannelAction::Reset => {
            update_channel_config(
                db,
                channel_id.get(),
                &ChannelConfigPatch::threshold_override(None),
            )
            .await?;
            info!(
                channel_id = channel_id.get(),
                user_id = ctx.author().id.get(),
                "auto-slowmode threshold override cleared"
            );
            status_embed(
                "Auto Slowmode Threshold Reset",
                format!("<#{channel_id}> now follows the server default threshold."),
                POSITIVE_COLOR,
            )
        }
    };

    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}
