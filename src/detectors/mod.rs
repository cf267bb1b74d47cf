//! Maneuver detectors.
//!
//! Each detector scans one cleaned trace and reports the events it found.
//! Detectors hold only their thresholds; all scanning state is local to a
//! single `detect` call, so trips can be processed independently.

pub mod acceleration;
pub mod hard_brake;
pub mod speeding;
pub mod turn;

pub use acceleration::{AccelerationDetector, AccelerationEvents};
pub use hard_brake::{HardBrakeDetector, HardBrakeEvents};
pub use speeding::{SpeedingDetector, SpeedingSummary};
pub use turn::{TurnDetector, TurnEvents};

/// A confirmed maneuver as a pair of sample indices into its trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

/// Flattens intervals into `[start, end, start, end, ...]`.
pub fn breakpoints(intervals: &[Interval]) -> Vec<usize> {
    intervals.iter().flat_map(|i| [i.start, i.end]).collect()
}
