/// Rate multipliers (relative to the threshold) and the slowmode each one
/// allows, ascending. A rate at or below `multiplier * threshold` gets that
/// rung's delay.
pub const SLOWMODE_LADDER: [(f64, u16); 8] = [
    (1.5, 5),
    (2.0, 10),
    (3.0, 15),
    (4.0, 30),
    (5.0, 60),
    (6.0, 120),
    (7.0, 300),
    (8.0, 600),
];

/// Delay used once the rate exceeds the top rung.
pub const SLOWMODE_CEILING_SECONDS: u16 = 900;

/// Map an observed rate (messages per minute) and threshold to a slowmode
/// delay in seconds. Pure and monotonic: a higher rate never yields a lower
/// delay, a higher threshold never yields a higher one.
pub fn decide_slowmode(rate: f64, threshold: u32) -> u16 {
    let threshold = f64::from(threshold.max(1));

    // NaN and anything at or under the threshold mean "no slowmode".
    if !(rate > threshold) {
        return 0;
    }

    SLOWMODE_LADDER
        .iter()
        .find(|(multiplier, _)| rate <= threshold * multiplier)
        .map_or(SLOWMODE_CEILING_SECONDS, |&(_, seconds)| seconds)
}
