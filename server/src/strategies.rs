//! Text-to-records strategies, tried in order of decreasing precision.
//!
//! Each strategy is a plain function of the scraped text. The chain returns
//! the output of the first one that produces anything; falling back to
//! synthetic data is the caller's business.

use chrono::FixedOffset;
use once_cell::sync::Lazy;
use regex::Regex;
use shared::models::WindObservation;
use uuid::Uuid;

use crate::parsers::{
    direction_to_degrees, is_direction, parse_speed, parse_temperature, parse_timestamp,
    CELSIUS_MARKER, DATE_RE, KNOTS_MARKER, SPEED_RE, TEMPERATURE_RE, TIME_RE, UPPER_RUN_RE,
};

pub const LINE_PATTERN: &str = "line-pattern";
pub const AGGREGATE_TOKEN: &str = "aggregate-token";

/// Most records the aggregate-token strategy will zip together.
pub const AGGREGATE_LIMIT: usize = 10;

/// Direction assumed when a row carries none.
pub const DEFAULT_DIRECTION: &str = "N";

static DEGREES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(\d{1,3})").unwrap());

pub type Strategy = fn(&str, &ParseContext) -> Vec<WindObservation>;

/// Strategies in the order they are attempted.
pub const STRATEGIES: [(&str, Strategy); 2] = [
    (LINE_PATTERN, line_pattern),
    (AGGREGATE_TOKEN, aggregate_tokens),
];

/// What every strategy needs besides the text.
#[derive(Clone, Debug)]
pub struct ParseContext {
    pub owner_id: String,
    /// Offset of the wall-clock times in the text.
    pub offset: FixedOffset,
    /// Maximum number of candidates to produce.
    pub limit: usize,
}

#[derive(Debug)]
pub struct Parsed {
    pub strategy: &'static str,
    pub observations: Vec<WindObservation>,
}

/// Run the strategies in order, stopping at the first non-empty result.
pub fn run_chain(text: &str, ctx: &ParseContext) -> Option<Parsed> {
    for (name, strategy) in STRATEGIES {
        let observations = strategy(text, ctx);
        if observations.is_empty() {
            log::debug!("Strategy {} found no records", name);
            continue;
        }
        log::debug!("Strategy {} found {} records", name, observations.len());
        return Some(Parsed {
            strategy: name,
            observations,
        });
    }
    None
}

fn qualifies(line: &str) -> bool {
    (line.contains(KNOTS_MARKER) || line.contains("knots"))
        && line.contains(CELSIUS_MARKER)
        && (line.contains('/') || line.contains(':'))
}

/// One observation per line: date, time, three speeds (min, avg, gust),
/// optional direction and degrees, then temperature. Lines missing a required
/// token are skipped.
pub fn line_pattern(text: &str, ctx: &ParseContext) -> Vec<WindObservation> {
    let mut observations = Vec::new();

    for line in text.lines() {
        if observations.len() >= ctx.limit {
            break;
        }
        if !qualifies(line) {
            continue;
        }
        match parse_line(line, ctx) {
            Some(obs) => observations.push(obs),
            None => log::debug!("Skipping unparsable line: {}", line.trim()),
        }
    }

    observations
}

fn parse_line(line: &str, ctx: &ParseContext) -> Option<WindObservation> {
    let date = DATE_RE.find(line)?;
    // Tokens are read left to right so that digits glued to the time
    // (`11:276 nodi`) never count as a speed.
    let time = TIME_RE.find_at(line, date.end())?;
    let rest = &line[time.end()..];

    let speeds: Vec<_> = SPEED_RE.find_iter(rest).take(3).collect();
    if speeds.len() < 3 {
        return None;
    }
    let tail = &rest[speeds[2].end()..];
    let temperature = TEMPERATURE_RE.find(tail)?;
    let (direction, degrees) = parse_direction(&tail[..temperature.start()]);

    let timestamp_millis = parse_timestamp(date.as_str(), time.as_str(), &ctx.offset)?;

    Some(WindObservation {
        id: Uuid::new_v4().to_string(),
        timestamp_millis,
        date: date.as_str().to_string(),
        time: time.as_str().to_string(),
        min_speed_knots: parse_speed(speeds[0].as_str()),
        avg_speed_knots: parse_speed(speeds[1].as_str()),
        gust_speed_knots: parse_speed(speeds[2].as_str()),
        direction,
        degrees,
        temperature_celsius: parse_temperature(temperature.as_str()),
        owner_id: ctx.owner_id.clone(),
    })
}

/// First compass code in `segment`, with the degrees written after it when
/// they are a valid bearing, else from the lookup table.
fn parse_direction(segment: &str) -> (String, u16) {
    for code in UPPER_RUN_RE.find_iter(segment) {
        if !is_direction(code.as_str()) {
            continue;
        }
        let degrees = DEGREES_RE
            .captures(&segment[code.end()..])
            .and_then(|caps| caps[1].parse::<u16>().ok())
            .filter(|deg| *deg < 360)
            .unwrap_or_else(|| direction_to_degrees(code.as_str()));
        return (code.as_str().to_string(), degrees);
    }
    (
        DEFAULT_DIRECTION.to_string(),
        direction_to_degrees(DEFAULT_DIRECTION),
    )
}

/// Last resort when rows have no usable line structure: collect every token
/// class over the whole text and zip them by position. Record `i` takes
/// date/time/direction `i` and speeds `[3i, 3i + 3)`.
pub fn aggregate_tokens(text: &str, ctx: &ParseContext) -> Vec<WindObservation> {
    let dates: Vec<&str> = DATE_RE.find_iter(text).map(|m| m.as_str()).collect();
    let times: Vec<&str> = TIME_RE.find_iter(text).map(|m| m.as_str()).collect();
    let speeds: Vec<u32> = SPEED_RE
        .find_iter(text)
        .map(|m| parse_speed(m.as_str()))
        .collect();
    let temperatures: Vec<i32> = TEMPERATURE_RE
        .find_iter(text)
        .map(|m| parse_temperature(m.as_str()))
        .collect();
    let directions: Vec<&str> = UPPER_RUN_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|code| is_direction(code))
        .collect();

    if dates.is_empty()
        || times.is_empty()
        || speeds.is_empty()
        || temperatures.is_empty()
        || directions.is_empty()
    {
        return Vec::new();
    }

    let count = AGGREGATE_LIMIT
        .min(dates.len())
        .min(times.len())
        .min(ctx.limit);
    let mut observations = Vec::with_capacity(count);

    for i in 0..count {
        let Some(triple) = speeds.get(3 * i..3 * i + 3) else {
            break;
        };
        let Some(timestamp_millis) = parse_timestamp(dates[i], times[i], &ctx.offset) else {
            log::debug!("Skipping invalid date/time {} {}", dates[i], times[i]);
            continue;
        };
        // Shorter classes repeat their last token.
        let direction = directions[i.min(directions.len() - 1)];
        let temperature = temperatures[i.min(temperatures.len() - 1)];

        observations.push(WindObservation {
            id: Uuid::new_v4().to_string(),
            timestamp_millis,
            date: dates[i].to_string(),
            time: times[i].to_string(),
            min_speed_knots: triple[0],
            avg_speed_knots: triple[1],
            gust_speed_knots: triple[2],
            direction: direction.to_string(),
            degrees: direction_to_degrees(direction),
            temperature_celsius: temperature,
            owner_id: ctx.owner_id.clone(),
        });
    }

    observations
}
