/// Embed colours and builders shared by commands and notices.
pub mod embed;
/// Human-facing formatting for slowmode values and rates.
pub mod formatting;
/// Single source of truth for the message-command prefix.
pub const COMMAND_PREFIX: char = '!';
/// Pure parser helpers.
pub mod parse;
/// Shared time helpers.
pub mod time;
