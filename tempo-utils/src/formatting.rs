/// Format a slowmode delay the way the stats embed shows it: `off`, `5s`,
/// `2m`, `1m 30s`, `1h`.
pub fn format_slowmode(seconds: u64) -> String {
    if seconds == 0 {
        return "off".to_owned();
    }

    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let parts: Vec<String> = [(hours, "h"), (minutes, "m"), (secs, "s")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();

    parts.join(" ")
}

/// Average messages per minute over a window of `window_seconds`.
pub fn per_minute(count: u64, window_seconds: u64) -> f64 {
    if window_seconds == 0 {
        return 0.0;
    }

    count as f64 * 60.0 / window_seconds as f64
}

pub fn format_rate(rate: f64) -> String {
    format!("{rate:.1} msg/min")
}
