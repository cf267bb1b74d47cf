//! Turn detection from heading.
//!
//! A turn starts with a heading change in the `start_min..start_max` band and
//! ends at the first sample where the heading settles (`< settle_max`). The
//! net change between those points must lie in `min_angle..=max_angle`;
//! anything smaller is drift and anything larger is treated as a heading
//! glitch, and the candidate is dropped.
//!
//! Headings are compared as plain numbers: no wraparound correction is
//! applied across the 0/360 boundary.

use crate::config::TurnThresholds;
use crate::detectors::{Interval, breakpoints};
use crate::scoring::utility::mean;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Candidate { start: usize },
}

/// Confirmed turns of one trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnEvents {
    /// `speed[start..end]` is the turn's speed profile (end exclusive).
    pub intervals: Vec<Interval>,
}

impl TurnEvents {
    pub fn count(&self) -> usize {
        self.intervals.len()
    }

    pub fn breakpoints(&self) -> Vec<usize> {
        breakpoints(&self.intervals)
    }

    /// Mean speed of each turn.
    pub fn speeds(&self, speed: &[f64]) -> Vec<f64> {
        self.intervals
            .iter()
            .map(|i| mean(&speed[i.start..i.end]))
            .collect()
    }
}

pub struct TurnDetector {
    thresholds: TurnThresholds,
}

impl TurnDetector {
    pub fn new(thresholds: TurnThresholds) -> Self {
        Self { thresholds }
    }

    pub fn detect(&self, heading: &[f64]) -> TurnEvents {
        let t = &self.thresholds;
        let mut state = State::Idle;
        let mut intervals = Vec::new();

        for i in 0..heading.len().saturating_sub(2) {
            let diff = (heading[i + 1] - heading[i]).abs();
            state = match state {
                State::Idle if diff > t.start_min && diff < t.start_max => State::Candidate {
                    start: i.saturating_sub(2),
                },
                State::Candidate { start } if diff < t.settle_max => {
                    let angle = (heading[i + 1] - heading[start]).abs();
                    if angle >= t.min_angle && angle <= t.max_angle {
                        intervals.push(Interval { start, end: i + 2 });
                    }
                    State::Idle
                }
                s => s,
            };
        }

        // a candidate still open here never settled and is dropped
        TurnEvents { intervals }
    }

    /// Number of turns whose mean speed exceeds the fast-turn threshold.
    pub fn count_fast(&self, events: &TurnEvents, speed: &[f64]) -> usize {
        events
            .speeds(speed)
            .into_iter()
            .filter(|s| *s > self.thresholds.fast_turn_speed)
            .count()
    }
}

impl Default for TurnDetector {
    fn default() -> Self {
        Self::new(TurnThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confirms_right_turn() {
        // opens at i=2 (start clamps to 0), settles at i=5 with a 91 degree net change
        let heading = [10.0, 10.0, 10.0, 40.0, 70.0, 100.0, 101.0, 101.0];
        let events = TurnDetector::default().detect(&heading);
        assert_eq!(events.count(), 1);
        assert_eq!(events.breakpoints(), vec![0, 7]);
    }

    #[test]
    fn test_reference_sequence_settle_and_bounds() {
        // diffs: 0, 30, 30, 2, 1, 53; the loop stops before the last diff
        let heading = [0.0, 0.0, 30.0, 60.0, 62.0, 63.0, 10.0];
        let events = TurnDetector::default().detect(&heading);
        // settles at i=3 with |62 - 0| = 62, inside [30, 150]
        assert_eq!(events.breakpoints(), vec![0, 5]);
    }

    #[test]
    fn test_discards_small_net_change() {
        // jumps 25 then back 20: net change under 30 degrees
        let heading = [90.0, 90.0, 90.0, 115.0, 95.0, 96.0, 96.0, 96.0];
        let events = TurnDetector::default().detect(&heading);
        assert_eq!(events.count(), 0);
        assert!(events.breakpoints().is_empty());
    }

    #[test]
    fn test_discards_reversal_over_max_angle() {
        let heading = [0.0, 0.0, 0.0, 60.0, 120.0, 160.0, 161.0, 161.0, 161.0];
        let events = TurnDetector::default().detect(&heading);
        assert_eq!(events.count(), 0);
    }

    #[test]
    fn test_boundary_angles_are_inclusive() {
        // net change exactly 30 and exactly 150 are kept
        let exact_30 = [0.0, 0.0, 0.0, 30.0, 30.0, 30.0];
        assert_eq!(TurnDetector::default().detect(&exact_30).count(), 1);
        let exact_150 = [0.0, 0.0, 0.0, 50.0, 100.0, 150.0, 150.0, 150.0];
        assert_eq!(TurnDetector::default().detect(&exact_150).count(), 1);
    }

    #[test]
    fn test_wraparound_is_not_corrected() {
        // 350 -> 20 is a 30 degree turn on the compass, but 350 -> 5 reads as a 345 jump
        let heading = [350.0, 350.0, 350.0, 5.0, 20.0, 20.0, 20.0];
        assert_eq!(TurnDetector::default().detect(&heading).count(), 0);
    }

    #[test]
    fn test_trailing_candidate_dropped() {
        let heading = [0.0, 0.0, 30.0, 60.0, 90.0, 120.0];
        let events = TurnDetector::default().detect(&heading);
        assert_eq!(events.count(), 0);
    }

    #[test]
    fn test_two_turns() {
        let heading = [
            0.0, 0.0, 0.0, 45.0, 90.0, 90.0, 90.0, 90.0, 90.0, 135.0, 180.0, 180.0, 180.0,
        ];
        let events = TurnDetector::default().detect(&heading);
        assert_eq!(events.count(), 2);
        assert_eq!(events.breakpoints(), vec![0, 6, 6, 12]);
    }

    #[test]
    fn test_fast_turns() {
        let heading = [0.0, 0.0, 0.0, 45.0, 90.0, 90.0, 90.0];
        let detector = TurnDetector::default();
        let events = detector.detect(&heading);
        assert_eq!(events.intervals, vec![Interval { start: 0, end: 6 }]);

        let slow = [5.0; 7];
        assert_eq!(detector.count_fast(&events, &slow), 0);
        let fast = [8.0; 7];
        assert_eq!(detector.count_fast(&events, &fast), 1);
        assert_eq!(events.speeds(&fast), vec![8.0]);
    }

    #[test]
    fn test_short_inputs() {
        let detector = TurnDetector::default();
        assert_eq!(detector.detect(&[]).count(), 0);
        assert_eq!(detector.detect(&[0.0, 45.0]).count(), 0);
    }

    proptest! {
        #[test]
        fn breakpoints_even_and_ordered(
            heading in prop::collection::vec(0.0f64..360.0, 0..200)
        ) {
            let events = TurnDetector::default().detect(&heading);
            let bp = events.breakpoints();
            prop_assert_eq!(bp.len() % 2, 0);
            prop_assert_eq!(bp.len() / 2, events.count());
            for i in &events.intervals {
                prop_assert!(i.start < i.end);
                prop_assert!(i.end < heading.len());
            }
        }
    }
}
