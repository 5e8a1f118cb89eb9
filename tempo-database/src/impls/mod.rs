/// Minute-bucket message counters.
pub mod activity;
/// Guild and channel auto-slowmode configuration.
pub mod slowmode_config;
