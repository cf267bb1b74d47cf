//! Output formatting and persistence for driving statistics and scores.
//!
//! Supports pretty-printing, JSON serialization, and CSV append.

use anyhow::{Context, Result};
use chrono::TimeDelta;
use csv::WriterBuilder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info};

use crate::parser::encode_trip_set;
use crate::scoring::types::{Maneuver, ScoreReport};
use crate::stats::{AgentStats, TurningSpeedSummary};
use crate::trace::TripSet;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let path = path.as_ref();
    let file_exists = path.exists();
    debug!(path = %path.display(), file_exists, "Appending CSV record");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

/// Writes any serializable value as pretty JSON.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Writes turning-speed statistics as a two-column `statistic,value` CSV.
pub fn write_summary(path: impl AsRef<Path>, summary: &TurningSpeedSummary) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(["statistic", "turning_speed"])?;
    for (name, value) in summary.rows() {
        let value = value.map(|v| v.to_string()).unwrap_or_default();
        writer.write_record([name, value.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a trip set as a trace file; gzip compressed when `path` ends in `.gz`.
pub fn write_trip_file(path: impl AsRef<Path>, trips: &TripSet) -> Result<()> {
    use std::io::Write;

    let path = path.as_ref();
    let json = encode_trip_set(trips)?;
    let mut file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;

    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(&json)?;
        encoder.finish()?;
    } else {
        file.write_all(&json)?;
    }
    info!(path = %path.display(), trips = trips.len(), "Trace file written");
    Ok(())
}

/// Renders seconds as `H:MM:SS`.
pub fn format_duration(seconds: f64) -> String {
    let d = TimeDelta::try_seconds(seconds.max(0.0).round() as i64).unwrap_or_else(TimeDelta::zero);
    format!(
        "{}:{:02}:{:02}",
        d.num_hours(),
        d.num_minutes() % 60,
        d.num_seconds() % 60
    )
}

/// Logs a score report together with the statistics behind it.
pub fn log_report(report: &ScoreReport, stats: &AgentStats) {
    info!(
        agent_id = %stats.agent_id,
        composite = format!("{:.2}", report.composite),
        "Safety score"
    );
    for m in Maneuver::ALL {
        info!("  {:<13} {}", m.to_string(), report.get(m));
    }
    info!(
        drive_time = %format_duration(stats.drive_time),
        hard_brakes = stats.hard_brake_count,
        accelerations = stats.acceleration_count,
        fast_turns = stats.fast_turn_count,
        turning_speed = format!("{:.2}", stats.turning_speed),
        speeding_events = stats.speeding_count,
        speeding_time = %format_duration(stats.speeding_duration),
        speeding_pct = format!("{:.2}", stats.speeding_pct()),
        "Driver statistics"
    );
}

/// Logs turning-speed statistics at the default level.
pub fn log_turning_summary(summary: &TurningSpeedSummary) {
    info!(
        turns = summary.count,
        mean = ?summary.mean,
        std = ?summary.std,
        min = ?summary.min,
        p25 = ?summary.p25,
        median = ?summary.p50,
        p75 = ?summary.p75,
        max = ?summary.max,
        "Turning speed summary"
    );
}
