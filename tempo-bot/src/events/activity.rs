use std::time::Instant;

use poise::serenity_prelude as serenity;
use tracing::error;

use tempo_core::Data;
use tempo_slowmode::InboundMessage;

/// Count a newly created message toward its channel's activity.
pub async fn handle_message_activity(data: &Data, message: &serenity::Message) {
    let arrived = Instant::now();
    let inbound = inbound_message(message);

    if let Err(source) = data.ingestor.observe(&inbound, arrived).await {
        error!(
            ?source,
            channel_id = inbound.channel_id,
            "failed to record message activity"
        );
    }
}

fn inbound_message(message: &serenity::Message) -> InboundMessage {
    InboundMessage {
        guild_id: message.guild_id.map(|guild_id| guild_id.get()),
        channel_id: message.channel_id.get(),
        from_human: !message.author.bot
            && !message.author.system
            && message.webhook_id.is_none(),
        unix_timestamp: u64::try_from(message.timestamp.unix_timestamp()).unwrap_or_default(),
    }
}
