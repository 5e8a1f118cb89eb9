use poise::serenity_prelude as serenity;

/// Default embed color used across the bot UI.
pub const DEFAULT_EMBED_COLOR: u32 = 0x90_55_30;
/// Something was switched on or returned to normal.
pub const POSITIVE_COLOR: u32 = 0x00_FF_00;
/// Partially applied or degraded state.
pub const WARNING_COLOR: u32 = 0xFF_A5_00;
/// Something got more restrictive, or is off.
pub const RESTRICTIVE_COLOR: u32 = 0xFF_00_00;
/// Something got less restrictive.
pub const RELAXED_COLOR: u32 = 0x00_FF_FF;

/// Build a plain titled embed.
pub fn status_embed(
    title: impl Into<String>,
    description: impl Into<String>,
    color: u32,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title(title)
        .description(description)
        .color(color)
}
