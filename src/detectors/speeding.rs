//! Speeding detection against a sparse series of posted limits.

use crate::services::speed_limit::SpeedLimitSeries;

/// Per-trace speeding totals.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpeedingSummary {
    /// Number of over-limit windows opened.
    pub events: usize,
    /// Sum of `(speed - limit) / limit` at each window opening.
    pub over_ratio_sum: f64,
    /// Seconds spent in closed windows.
    pub duration: f64,
}

/// Walks the trace with a pointer into the limit series. The pointer moves at
/// most one lookup per sample once the sample index passes that lookup's
/// call index, and holds at the last lookup.
#[derive(Debug, Default)]
pub struct SpeedingDetector;

impl SpeedingDetector {
    pub fn new() -> Self {
        Self
    }

    pub fn detect(&self, speed: &[f64], time: &[f64], limits: &SpeedLimitSeries) -> SpeedingSummary {
        let mut summary = SpeedingSummary::default();
        if limits.is_empty() {
            return summary;
        }

        let last_call = limits.call_indices.len() - 1;
        let last_limit = limits.limits.len() - 1;
        let mut j = 0;
        let mut window_start: Option<f64> = None;

        for i in 0..speed.len().saturating_sub(1) {
            if i > limits.call_indices[j] && j < last_call {
                j += 1;
            }
            j = j.min(last_limit);

            let limit = limits.limits[j];
            if limit <= 0.0 {
                continue;
            }

            match window_start {
                None if limit < speed[i] && speed[i + 1] > limit => {
                    window_start = Some(time[i]);
                    summary.events += 1;
                    summary.over_ratio_sum += (speed[i] - limit) / limit;
                }
                Some(start) if limit > speed[i] => {
                    summary.duration += time[i] - start;
                    window_start = None;
                }
                _ => {}
            }
        }

        summary
    }
}
