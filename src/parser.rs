//! Decoding of trip files and trip-store responses into [`Trace`]s.
//!
//! A trip file is a JSON object keyed by trip id; each value holds five
//! parallel arrays `[lat, lon, speed, heading, time]`, with `null` where a
//! speed or heading is unknown. Files may be gzip compressed.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use crate::services::trip_store::LocationSample;
use crate::trace::{Trace, TripSet};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

type TripRecord = (
    Vec<f64>,
    Vec<f64>,
    Vec<Option<f64>>,
    Vec<Option<f64>>,
    Vec<f64>,
);

/// Decodes a (possibly gzip compressed) trip file.
///
/// # Errors
///
/// Returns an error if the bytes are not valid JSON of the expected shape or
/// if any trip's sequences are misaligned or empty.
pub fn parse_trip_file(bytes: &[u8]) -> Result<TripSet> {
    let records: BTreeMap<String, TripRecord> = if bytes.starts_with(&GZIP_MAGIC) {
        let mut json = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .context("decompressing trip file")?;
        serde_json::from_slice(&json)?
    } else {
        serde_json::from_slice(bytes)?
    };

    records
        .into_iter()
        .map(|(trip_id, (lat, lon, speed, heading, time))| -> Result<(String, Trace)> {
            let trace = Trace::new(&trip_id, lat, lon, speed, heading, time)?;
            Ok((trip_id, trace))
        })
        .collect()
}

/// Reads and decodes a trip file from disk.
pub fn load_trip_file(path: impl AsRef<Path>) -> Result<TripSet> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("reading trip file {}", path.display()))?;
    parse_trip_file(&bytes).with_context(|| format!("decoding trip file {}", path.display()))
}

/// Encodes trips in the trip-file layout.
pub fn encode_trip_set(trips: &TripSet) -> Result<Vec<u8>> {
    let records: BTreeMap<&str, (&[f64], &[f64], &[Option<f64>], &[Option<f64>], &[f64])> = trips
        .iter()
        .map(|(id, t)| {
            (
                id.as_str(),
                (
                    t.lat.as_slice(),
                    t.lon.as_slice(),
                    t.speed.as_slice(),
                    t.heading.as_slice(),
                    t.time.as_slice(),
                ),
            )
        })
        .collect();
    Ok(serde_json::to_vec(&records)?)
}

/// Agent id to trip ids, as written by `query --trip-index`.
pub type TripIndex = BTreeMap<String, Vec<String>>;

/// Reads a trip index JSON file.
pub fn load_trip_index(path: impl AsRef<Path>) -> Result<TripIndex> {
    let path = path.as_ref();
    let bytes =
        std::fs::read(path).with_context(|| format!("reading trip index {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("decoding trip index {}", path.display()))
}

/// Converts trip-store samples into traces; millisecond timestamps become
/// whole epoch seconds. Trips without samples are skipped.
pub fn traces_from_samples(samples: HashMap<String, Vec<LocationSample>>) -> Result<TripSet> {
    samples
        .into_iter()
        .filter(|(_, points)| !points.is_empty())
        .map(|(trip_id, points)| -> Result<(String, Trace)> {
            let trace = Trace::new(
                &trip_id,
                points.iter().map(|p| p.lat).collect(),
                points.iter().map(|p| p.lon).collect(),
                points.iter().map(|p| p.speed).collect(),
                points.iter().map(|p| p.heading).collect(),
                points
                    .iter()
                    .map(|p| p.timestamp_ms.div_euclid(1000) as f64)
                    .collect(),
            )?;
            Ok((trip_id, trace))
        })
        .collect()
}
