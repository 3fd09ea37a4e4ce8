//! WMO weather interpretation codes.

use std::ops::RangeInclusive;

/// Description used when no range matches.
pub const UNKNOWN_CONDITION: &str = "unknown condition";

/// Ordered code ranges; the first match wins.
const WEATHER_CODES: &[(RangeInclusive<i64>, &str)] = &[
    (0..=0, "clear sky"),
    (1..=3, "partly cloudy"),
    (45..=48, "fog"),
    (51..=57, "drizzle"),
    (61..=67, "rain"),
    (71..=77, "snow"),
    (80..=82, "heavy rain"),
    (95..=99, "thunderstorm"),
];

/// Map a weather code to its description.
pub fn describe(code: i64) -> &'static str {
    WEATHER_CODES
        .iter()
        .find(|(range, _)| range.contains(&code))
        .map(|(_, description)| *description)
        .unwrap_or(UNKNOWN_CONDITION)
}
