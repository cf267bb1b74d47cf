use serde::{Deserialize, Serialize};

use crate::aggregate::ManeuverTotals;
use crate::scoring::utility::{mean, quantile, sample_stddev};

/// One agent's aggregated driving record: a row of the population file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentStats {
    pub agent_id: String,
    pub fast_turn_count: usize,
    /// Mean turning speed, m/s.
    pub turning_speed: f64,
    pub hard_brake_count: usize,
    pub acceleration_count: usize,
    /// Average `(speed - limit) / limit` at the start of speeding events.
    pub over_speed_ratio: f64,
    /// Seconds.
    pub speeding_duration: f64,
    pub speeding_count: usize,
    /// Seconds.
    pub drive_time: f64,
}

impl AgentStats {
    pub fn from_totals(agent_id: &str, totals: &ManeuverTotals) -> Self {
        AgentStats {
            agent_id: agent_id.to_string(),
            fast_turn_count: totals.fast_turns,
            turning_speed: totals.mean_turning_speed(),
            hard_brake_count: totals.hard_brakes,
            acceleration_count: totals.accelerations,
            over_speed_ratio: totals.mean_over_ratio(),
            speeding_duration: totals.speeding_duration,
            speeding_count: totals.speeding_events,
            drive_time: totals.drive_time,
        }
    }

    /// Share of drive time spent speeding.
    pub fn speeding_pct(&self) -> f64 {
        if self.drive_time <= 0.0 {
            0.0
        } else {
            self.speeding_duration / self.drive_time * 100.0
        }
    }
}

/// Descriptive statistics of turning speeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurningSpeedSummary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

impl TurningSpeedSummary {
    pub fn from_speeds(speeds: &[f64]) -> Self {
        if speeds.is_empty() {
            return Self::default();
        }
        let mut sorted = speeds.to_vec();
        sorted.sort_by(f64::total_cmp);
        let m = mean(&sorted);

        TurningSpeedSummary {
            count: sorted.len(),
            mean: Some(m),
            std: sample_stddev(&sorted, m),
            min: sorted.first().copied(),
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.5),
            p75: quantile(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }

    /// `(name, value)` pairs in display order.
    pub fn rows(&self) -> Vec<(&'static str, Option<f64>)> {
        vec![
            ("count", Some(self.count as f64)),
            ("mean", self.mean),
            ("std", self.std),
            ("min", self.min),
            ("25%", self.p25),
            ("50%", self.p50),
            ("75%", self.p75),
            ("max", self.max),
        ]
    }
}
