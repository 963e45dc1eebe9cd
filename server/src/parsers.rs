//! Field extractors for scraped wind rows.
//!
//! Every function here is total: malformed input yields the documented
//! default instead of an error, and the caller decides what a default means.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Unit token the source uses for knots.
pub const KNOTS_MARKER: &str = "nodi";
/// Celsius marker following temperatures.
pub const CELSIUS_MARKER: &str = "°C";

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const TIME_FORMAT: &str = "%H:%M";

pub(crate) static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:nodi|knots)").unwrap());
pub(crate) static TEMPERATURE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(-?\d+)\s*°C").unwrap());
pub(crate) static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());
pub(crate) static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{2}:\d{2}").unwrap());
/// Maximal uppercase runs; callers keep the ones that are compass codes.
pub(crate) static UPPER_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]+").unwrap());

/// The 16 codes used by the source, clockwise from north.
pub const COMPASS_POINTS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSO", "SO", "OSO", "O", "ONO", "NO",
    "NNO",
];

// Degrees are truncated to whole numbers, as the source publishes them.
const DIRECTIONS: [(&str, u16); 23] = [
    ("N", 0),
    ("NNE", 22),
    ("NE", 45),
    ("ENE", 67),
    ("E", 90),
    ("ESE", 112),
    ("SE", 135),
    ("SSE", 157),
    ("S", 180),
    ("SSO", 202),
    ("SO", 225),
    ("OSO", 247),
    ("O", 270),
    ("ONO", 292),
    ("NO", 315),
    ("NNO", 337),
    ("SSW", 202),
    ("SW", 225),
    ("WSW", 247),
    ("W", 270),
    ("WNW", 292),
    ("NW", 315),
    ("NNW", 337),
];

/// Leading integer of a `"<n> nodi"` fragment, `0` when there is none.
pub fn parse_speed(text: &str) -> u32 {
    SPEED_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

/// Integer right before `°C`, `0` when there is none.
pub fn parse_temperature(text: &str) -> i32 {
    TEMPERATURE_RE
        .captures(text)
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(0)
}

pub fn is_direction(code: &str) -> bool {
    DIRECTIONS.iter().any(|(d, _)| *d == code)
}

/// Degrees for a compass code; unknown codes map to `0`.
pub fn direction_to_degrees(code: &str) -> u16 {
    DIRECTIONS
        .iter()
        .find(|(d, _)| *d == code)
        .map(|(_, deg)| *deg)
        .unwrap_or(0)
}

/// Epoch milliseconds for a `DD/MM/YYYY` date and `HH:MM` time read in the
/// source's offset. `None` when either is not a real calendar value.
pub fn parse_timestamp(date: &str, time: &str, offset: &FixedOffset) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let time = NaiveTime::parse_from_str(time, TIME_FORMAT).ok()?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.timestamp_millis())
}

/// Display strings (`DD/MM/YYYY`, `HH:MM`) for an instant.
pub fn format_date_time(at: &DateTime<FixedOffset>) -> (String, String) {
    (
        at.format(DATE_FORMAT).to_string(),
        at.format(TIME_FORMAT).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("7 nodi"), 7);
        assert_eq!(parse_speed("12nodi"), 12);
        assert_eq!(parse_speed("  3   nodi  "), 3);
        assert_eq!(parse_speed("15 knots"), 15);
    }

    #[test]
    fn test_parse_speed_defaults() {
        assert_eq!(parse_speed("abc nodi"), 0);
        assert_eq!(parse_speed(""), 0);
        assert_eq!(parse_speed("7"), 0);
        assert_eq!(parse_speed("99999999999999 nodi"), 0); // overflow
    }

    #[test]
    fn test_parse_temperature() {
        assert_eq!(parse_temperature("25°C"), 25);
        assert_eq!(parse_temperature("ENE67 30°C"), 30);
        assert_eq!(parse_temperature("-3°C"), -3);
        assert_eq!(parse_temperature("garbage"), 0);
        assert_eq!(parse_temperature("25°F"), 0);
    }

    #[test]
    fn test_direction_to_degrees() {
        assert_eq!(direction_to_degrees("NE"), 45);
        assert_eq!(direction_to_degrees("ENE"), 67);
        assert_eq!(direction_to_degrees("SSO"), 202);
        assert_eq!(direction_to_degrees("NO"), 315);
        assert_eq!(direction_to_degrees("W"), 270);
        assert_eq!(direction_to_degrees("XX"), 0);
        assert_eq!(direction_to_degrees(""), 0);
    }

    #[test]
    fn test_compass_points_are_known() {
        for point in COMPASS_POINTS {
            assert!(is_direction(point), "{} missing from table", point);
        }
        assert!(!is_direction("C"));
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("17/07/2025", "11:27", &utc()).unwrap();
        // 2025-07-17T11:27:00Z
        assert_eq!(ts, 1752751620000);

        let cest = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = parse_timestamp("17/07/2025", "11:27", &cest).unwrap();
        assert_eq!(ts - local, 2 * 3600 * 1000);
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("32/13/2025", "11:27", &utc()).is_none());
        assert!(parse_timestamp("29/02/2025", "11:27", &utc()).is_none());
        assert!(parse_timestamp("17/07/2025", "25:00", &utc()).is_none());
        assert!(parse_timestamp("2025-07-17", "11:27", &utc()).is_none());
    }

    #[test]
    fn test_format_date_time() {
        let at = utc().with_ymd_and_hms(2025, 7, 3, 9, 5, 0).unwrap();
        let (date, time) = format_date_time(&at);
        assert_eq!(date, "03/07/2025");
        assert_eq!(time, "09:05");
    }
}
