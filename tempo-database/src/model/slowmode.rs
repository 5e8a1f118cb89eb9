use serde::{Deserialize, Serialize};

/// Messages per minute above which throttling starts when a guild has not
/// chosen its own default.
pub const DEFAULT_THRESHOLD: u32 = 10;
/// Reconciliation cadence recorded for newly created guild rows.
pub const DEFAULT_UPDATE_INTERVAL_SECONDS: u32 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub guild_id: u64,
    pub enabled: bool,
    pub default_threshold: u32,
    pub update_interval_seconds: u32,
}

impl GuildConfig {
    /// The row created on first access.
    pub fn with_defaults(guild_id: u64) -> Self {
        Self {
            guild_id,
            enabled: true,
            default_threshold: DEFAULT_THRESHOLD,
            update_interval_seconds: DEFAULT_UPDATE_INTERVAL_SECONDS,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub channel_id: u64,
    pub guild_id: u64,
    pub enabled: bool,
    pub threshold_override: Option<u32>,
}

impl ChannelConfig {
    /// The row created on first access.
    pub fn with_defaults(channel_id: u64, guild_id: u64) -> Self {
        Self {
            channel_id,
            guild_id,
            enabled: true,
            threshold_override: None,
        }
    }

    /// Channel override when present, guild default otherwise.
    pub fn effective_threshold(&self, guild: &GuildConfig) -> u32 {
        self.threshold_override
            .unwrap_or(guild.default_threshold)
            .max(1)
    }
}

/// Partial update for a guild row. `None` fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GuildConfigPatch {
    pub enabled: Option<bool>,
    pub default_threshold: Option<u32>,
    pub update_interval_seconds: Option<u32>,
}

impl GuildConfigPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn default_threshold(threshold: u32) -> Self {
        Self {
            default_threshold: Some(threshold),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_none()
            && self.default_threshold.is_none()
            && self.update_interval_seconds.is_none()
    }

    pub fn apply(&self, config: &mut GuildConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(threshold) = self.default_threshold {
            config.default_threshold = threshold;
        }
        if let Some(interval) = self.update_interval_seconds {
            config.update_interval_seconds = interval;
        }
    }
}

/// Partial update for a channel row.
///
/// `threshold_override` is doubly optional: `None` leaves the column alone,
/// `Some(None)` clears the override, `Some(Some(n))` sets it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelConfigPatch {
    pub enabled: Option<bool>,
    pub threshold_override: Option<Option<u32>>,
}

impl ChannelConfigPatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }

    pub fn threshold_override(threshold: Option<u32>) -> Self {
        Self {
            threshold_override: Some(threshold),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_none() && self.threshold_override.is_none()
    }

    pub fn apply(&self, config: &mut ChannelConfig) {
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }
        if let Some(threshold) = self.threshold_override {
            config.threshold_override = threshold;
        }
    }
}
