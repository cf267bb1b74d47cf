//! Trip traces: five index-aligned sample sequences per trip.

use std::collections::BTreeMap;

use crate::error::TraceError;

/// Raw trip keyed by trip id.
pub type TripSet = BTreeMap<String, Trace>;

/// Trips that survived cleaning, keyed by trip id.
pub type CleanTripSet = BTreeMap<String, CleanTrace>;

/// One trip as collected: speed and heading may be missing per sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    /// m/s
    pub speed: Vec<Option<f64>>,
    /// Degrees, 0–360.
    pub heading: Vec<Option<f64>>,
    /// Epoch seconds, non-decreasing.
    pub time: Vec<f64>,
}

impl Trace {
    /// Builds a trace, checking that all sequences are aligned and non-empty.
    pub fn new(
        trip_id: &str,
        lat: Vec<f64>,
        lon: Vec<f64>,
        speed: Vec<Option<f64>>,
        heading: Vec<Option<f64>>,
        time: Vec<f64>,
    ) -> Result<Self, TraceError> {
        let n = lat.len();
        if [lon.len(), speed.len(), heading.len(), time.len()]
            .iter()
            .any(|len| *len != n)
        {
            return Err(TraceError::LengthMismatch {
                trip_id: trip_id.to_string(),
            });
        }
        if n == 0 {
            return Err(TraceError::Empty {
                trip_id: trip_id.to_string(),
            });
        }
        Ok(Self {
            lat,
            lon,
            speed,
            heading,
            time,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn drive_time(&self) -> f64 {
        drive_time(&self.time)
    }
}

/// A trace after gap filling: every sample has a speed and a heading.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanTrace {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub speed: Vec<f64>,
    pub heading: Vec<f64>,
    pub time: Vec<f64>,
}

impl CleanTrace {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn drive_time(&self) -> f64 {
        drive_time(&self.time)
    }
}

/// `time[-1] - time[0]`, or 0 for fewer than two samples.
pub fn drive_time(time: &[f64]) -> f64 {
    match (time.first(), time.last()) {
        (Some(first), Some(last)) if time.len() > 1 => last - first,
        _ => 0.0,
    }
}

/// Sum of per-trip drive times.
pub fn total_drive_time(trips: &CleanTripSet) -> f64 {
    trips.values().map(CleanTrace::drive_time).sum()
}
