//! Placeholder observations for runs where nothing could be parsed.

use chrono::{DateTime, FixedOffset};
use rand::Rng;
use shared::models::WindObservation;
use uuid::Builder;

use crate::parsers::{direction_to_degrees, format_date_time, COMPASS_POINTS};

/// Plausible reading stamped `now`. Randomness comes only from `rng`, so a
/// seeded generator reproduces the same record.
pub fn generate<R: Rng>(
    rng: &mut R,
    owner_id: &str,
    now: DateTime<FixedOffset>,
) -> WindObservation {
    let direction = COMPASS_POINTS[rng.random_range(0..COMPASS_POINTS.len())];
    let avg_speed_knots: u32 = rng.random_range(2..=13);
    let min_speed_knots = avg_speed_knots.saturating_sub(rng.random_range(0..=3));
    let gust_speed_knots = avg_speed_knots + rng.random_range(2..=9);
    let temperature_celsius: i32 = rng.random_range(18..=29);
    let (date, time) = format_date_time(&now);

    WindObservation {
        id: Builder::from_random_bytes(rng.random()).into_uuid().to_string(),
        timestamp_millis: now.timestamp_millis(),
        date,
        time,
        min_speed_knots,
        avg_speed_knots,
        gust_speed_knots,
        direction: direction.to_string(),
        degrees: direction_to_degrees(direction),
        temperature_celsius,
        owner_id: owner_id.to_string(),
    }
}
