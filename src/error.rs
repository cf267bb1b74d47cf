//! Typed errors for trace construction and scoring.
//!
//! Data-quality problems inside a trace are not errors: they are corrected in
//! place or the trip is excluded (see [`crate::preprocess::Exclusion`]). Only
//! the conditions below abort an operation.

use thiserror::Error;

/// Errors raised while building a [`crate::trace::Trace`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    #[error("trip {trip_id}: sample sequences differ in length")]
    LengthMismatch { trip_id: String },

    #[error("trip {trip_id}: no samples")]
    Empty { trip_id: String },
}

/// Errors raised by the scoring engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// The agent has not driven long enough for a meaningful score.
    #[error("total drive time should not be less than {minimum}s, was {drive_time}s")]
    InsufficientSample { drive_time: f64, minimum: f64 },

    /// Rates cannot be normalized without positive drive time.
    #[error("agent {0} has no recorded drive time")]
    NoDriveTime(String),

    /// A population standard deviation is zero (or not finite).
    #[error("degenerate population statistics for {0}: standard deviation must be positive")]
    DegenerateStatistics(String),

    /// No usable rows in the population sample.
    #[error("population sample is empty")]
    EmptyPopulation,

    #[error("agent {0} not found in population")]
    UnknownAgent(String),

    /// Composite weights must be non-negative and sum to 1.
    #[error("scoring weights must sum to 1.0, got {0}")]
    InvalidWeights(f64),
}
