use anyhow::Result;
use chrono::NaiveDate;
use shared::models::WindObservation;
use std::io::Write;

pub const HEADER: [&str; 8] = [
    "Date",
    "Time",
    "Min Speed (knots)",
    "Avg Speed (knots)",
    "Gusts (knots)",
    "Direction",
    "Degrees",
    "Temperature (°C)",
];

/// Write `observations` as CSV, one row per record in the given order.
pub fn write_csv<W: Write>(writer: W, observations: &[WindObservation]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(HEADER)?;
    for obs in observations {
        wtr.write_record([
            obs.date.clone(),
            obs.time.clone(),
            obs.min_speed_knots.to_string(),
            obs.avg_speed_knots.to_string(),
            obs.gust_speed_knots.to_string(),
            obs.direction.clone(),
            obs.degrees.to_string(),
            obs.temperature_celsius.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(observations: &[WindObservation]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, observations)?;
    Ok(String::from_utf8(buf)?)
}

/// Download name for an export made on `day`.
pub fn export_filename(day: NaiveDate) -> String {
    format!("wind-data-{}.csv", day.format("%Y-%m-%d"))
}
