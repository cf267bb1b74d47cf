//! Hard brake detection: pointwise deceleration within a plausible band.

use crate::config::HardBrakeThresholds;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HardBrakeEvents {
    /// Sample `i` is flagged when the drop from `i` to `i + 1` is a hard brake.
    pub indices: Vec<usize>,
}

impl HardBrakeEvents {
    pub fn count(&self) -> usize {
        self.indices.len()
    }
}

pub struct HardBrakeDetector {
    thresholds: HardBrakeThresholds,
}

impl HardBrakeDetector {
    pub fn new(thresholds: HardBrakeThresholds) -> Self {
        Self { thresholds }
    }

    pub fn detect(&self, speed: &[f64], time: &[f64]) -> HardBrakeEvents {
        let t = &self.thresholds;
        let indices = (0..speed.len().saturating_sub(1))
            .filter(|&i| {
                let dt = (time[i + 1] - time[i]).max(1.0);
                let rate = (speed[i] - speed[i + 1]) / dt;
                rate > t.min_rate && rate < t.max_rate
            })
            // the first sample is a trace-start artifact, never a real brake
            .filter(|&i| i != 0)
            .collect();

        HardBrakeEvents { indices }
    }
}

impl Default for HardBrakeDetector {
    fn default() -> Self {
        Self::new(HardBrakeThresholds::default())
    }
}
