//! Harsh acceleration detection from speed.
//!
//! An event opens on a per-sample speed gain inside `start_min..start_max`
//! and closes on the first gain below `end_max`. It only counts if more than
//! `min_duration` seconds passed between the two samples; shorter bursts are
//! speed noise.

use crate::config::AccelerationThresholds;
use crate::detectors::{Interval, breakpoints};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Open { start: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccelerationEvents {
    /// Inclusive on both ends.
    pub intervals: Vec<Interval>,
}

impl AccelerationEvents {
    pub fn count(&self) -> usize {
        self.intervals.len()
    }

    pub fn breakpoints(&self) -> Vec<usize> {
        breakpoints(&self.intervals)
    }
}

pub struct AccelerationDetector {
    thresholds: AccelerationThresholds,
}

impl AccelerationDetector {
    pub fn new(thresholds: AccelerationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn detect(&self, speed: &[f64], time: &[f64]) -> AccelerationEvents {
        let t = &self.thresholds;
        let mut state = State::Idle;
        let mut intervals = Vec::new();

        for i in 0..speed.len().saturating_sub(1) {
            let diff = speed[i + 1] - speed[i];
            state = match state {
                State::Idle if diff > t.start_min && diff < t.start_max => {
                    State::Open { start: i }
                }
                State::Open { start } if diff < t.end_max => {
                    if time[i] - time[start] > t.min_duration {
                        intervals.push(Interval { start, end: i });
                    }
                    State::Idle
                }
                s => s,
            };
        }

        AccelerationEvents { intervals }
    }
}

impl Default for AccelerationDetector {
    fn default() -> Self {
        Self::new(AccelerationThresholds::default())
    }
}
