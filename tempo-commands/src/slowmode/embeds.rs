use tempo_utils::formatting::{format_rate, format_slowmode, per_minute};

pub fn guild_only_message() -> &'static str {
    "This command only works in servers."
}

pub fn invalid_channel_message() -> &'static str {
    "Provide a text channel of this server as a mention or id."
}

pub fn invalid_threshold_message() -> String {
    format!(
        "Threshold must be a whole number of messages per minute between {} and {}.",
        tempo_utils::parse::MIN_THRESHOLD,
        tempo_utils::parse::MAX_THRESHOLD
    )
}

pub fn not_tracked_description(channel_id: u64) -> String {
    format!("Auto Slowmode is not enabled for <#{channel_id}> hence no messages were tracked.")
}

/// Everything the stats embed shows for one enabled channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChannelStats {
    pub channel_id: u64,
    pub guild_enabled: bool,
    pub threshold: u32,
    pub live_rate: f64,
    pub last_minute: u64,
    pub last_five_minutes: u64,
    pub last_fifteen_minutes: u64,
    /// `None` when the channel could not be fetched.
    pub slowmode_seconds: Option<u16>,
}

impl ChannelStats {
    pub fn status(&self) -> &'static str {
        if self.guild_enabled {
            "Enabled"
        } else {
            "Partially Enabled"
        }
    }

    pub fn description(&self) -> String {
        let slowmode = self
            .slowmode_seconds
            .map_or_else(|| "unknown".to_owned(), |seconds| format_slowmode(u64::from(seconds)));

        let mut out = format!(
            "**Auto-Slowmode Statistics for <#{}>**\n\n\
             **Status:** {}\n\
             **Message Rate Threshold:** {} messages per minute\n\n\
             **Current Activity:**\n\
             • Current rate: {}\n\
             • Last minute: {} messages ({})\n\
             • Last 5 minutes: {} messages ({} avg)\n\
             • Last 15 minutes: {} messages ({} avg)\n\n\
             **Current Slowmode:** {}",
            self.channel_id,
            self.status(),
            self.threshold,
            format_rate(self.live_rate),
            self.last_minute,
            format_rate(per_minute(self.last_minute, 60)),
            self.last_five_minutes,
            format_rate(per_minute(self.last_five_minutes, 300)),
            self.last_fifteen_minutes,
            format_rate(per_minute(self.last_fifteen_minutes, 900)),
            slowmode,
        );

        if !self.guild_enabled {
            out.push_str(
                "\n\n**Note:** Auto-slowmode is enabled for this channel but disabled server-wide.",
            );
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::{ChannelStats, not_tracked_description};

    fn stats() -> ChannelStats {
        ChannelStats {
            channel_id: 42,
            guild_enabled: true,
            threshold: 10,
            live_rate: 12.0,
            last_minute: 12,
            last_five_minutes: 30,
            last_fifteen_minutes: 45,
            slowmode_seconds: Some(90),
        }
    }

    #[test]
    fn describes_enabled_channel() {
        let description = stats().description();
        assert!(description.contains("**Status:** Enabled\n"));
        assert!(description.contains("10 messages per minute"));
        assert!(description.contains("Last 5 minutes: 30 messages (6.0 msg/min avg)"));
        assert!(description.contains("Last 15 minutes: 45 messages (3.0 msg/min avg)"));
        assert!(description.contains("**Current Slowmode:** 1m 30s"));
        assert!(!description.contains("Note"));
    }

    #[test]
    fn flags_guild_wide_disable() {
        let stats = ChannelStats {
            guild_enabled: false,
            slowmode_seconds: None,
            ..stats()
        };
        let description = stats.description();
        assert_eq!(stats.status(), "Partially Enabled");
        assert!(description.contains("**Current Slowmode:** unknown"));
        assert!(description.ends_with("disabled server-wide."));
    }

    #[test]
    fn untracked_channel_mentions_it() {
        assert!(not_tracked_description(7).contains("<#7>"));
    }
}
