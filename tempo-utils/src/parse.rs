/// Smallest accepted messages-per-minute threshold.
pub const MIN_THRESHOLD: u32 = 1;
/// Largest accepted messages-per-minute threshold.
pub const MAX_THRESHOLD: u32 = 1_000;

/// Parse a channel mention (`<#123>`) or a raw channel id.
pub fn parse_channel_id(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u64>() {
        return Some(id).filter(|id| *id != 0);
    }

    raw.strip_prefix("<#")
        .and_then(|rest| rest.strip_suffix('>'))
        .and_then(|id| id.parse::<u64>().ok())
        .filter(|id| *id != 0)
}

/// Parse a threshold argument, rejecting anything outside
/// `MIN_THRESHOLD..=MAX_THRESHOLD`.
pub fn parse_threshold(raw: &str) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| (MIN_THRESHOLD..=MAX_THRESHOLD).contains(value))
}

#[cfg(test)]
mod tests {
    use super::{parse_channel_id, parse_threshold};

    #[test]
    fn parses_channel_ids_and_mentions() {
        assert_eq!(parse_channel_id("123456789"), Some(123_456_789));
        assert_eq!(parse_channel_id(" <#42> "), Some(42));
        assert_eq!(parse_channel_id("<#abc>"), None);
        assert_eq!(parse_channel_id("#42"), None);
        assert_eq!(parse_channel_id("0"), None);
        assert_eq!(parse_channel_id(""), None);
    }

    #[test]
    fn thresholds_are_bounded() {
        assert_eq!(parse_threshold("1"), Some(1));
        assert_eq!(parse_threshold(" 250 "), Some(250));
        assert_eq!(parse_threshold("1000"), Some(1_000));
        assert_eq!(parse_threshold("0"), None);
        assert_eq!(parse_threshold("1001"), None);
        assert_eq!(parse_threshold("-3"), None);
        assert_eq!(parse_threshold("ten"), None);
    }
}
