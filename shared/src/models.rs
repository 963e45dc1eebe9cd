use serde::{Deserialize, Serialize};

/// One wind reading, as scraped or synthesized.
///
/// `timestamp_millis` is the identity used for merging; `id` only keys UI
/// rows. `date` and `time` keep the source formatting (`DD/MM/YYYY`,
/// `HH:MM`) verbatim. Speeds are not checked against each other.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindObservation {
    pub id: String,
    pub timestamp_millis: i64,
    pub date: String,
    pub time: String,
    pub min_speed_knots: u32,
    pub avg_speed_knots: u32,
    pub gust_speed_knots: u32,
    pub direction: String,
    pub degrees: u16,
    pub temperature_celsius: i32,
    pub owner_id: String,
}
