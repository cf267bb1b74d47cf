//! Data types used by the scoring pipeline.

use serde::Serialize;
use std::fmt;

use crate::stats::AgentStats;

/// The four scored maneuvers, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Maneuver {
    HardBrake,
    Acceleration,
    Turning,
    Speeding,
}

impl Maneuver {
    pub const ALL: [Maneuver; 4] = [
        Maneuver::HardBrake,
        Maneuver::Acceleration,
        Maneuver::Turning,
        Maneuver::Speeding,
    ];
}

impl fmt::Display for Maneuver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Maneuver::HardBrake => "hard brake",
            Maneuver::Acceleration => "acceleration",
            Maneuver::Turning => "turning",
            Maneuver::Speeding => "speeding",
        })
    }
}

/// Maneuver frequencies normalized by drive time (per second).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RateVector {
    pub hard_brake: f64,
    pub acceleration: f64,
    /// Fast turns per second.
    pub turning: f64,
    /// Average over-speed ratio times speeding seconds, per second.
    pub speeding: f64,
}

impl RateVector {
    /// `None` when the agent has no drive time to normalize by.
    pub fn from_stats(stats: &AgentStats) -> Option<Self> {
        let time = stats.drive_time;
        if time <= 0.0 || !time.is_finite() {
            return None;
        }
        Some(RateVector {
            hard_brake: stats.hard_brake_count as f64 / time,
            acceleration: stats.acceleration_count as f64 / time,
            turning: stats.fast_turn_count as f64 / time,
            speeding: stats.over_speed_ratio * stats.speeding_duration / time,
        })
    }

    pub fn get(&self, maneuver: Maneuver) -> f64 {
        match maneuver {
            Maneuver::HardBrake => self.hard_brake,
            Maneuver::Acceleration => self.acceleration,
            Maneuver::Turning => self.turning,
            Maneuver::Speeding => self.speeding,
        }
    }
}

/// Per-maneuver safety scores (5 safest, 1 least safe) and their weighted
/// composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreReport {
    pub hard_brake: u8,
    pub acceleration: u8,
    pub turning: u8,
    pub speeding: u8,
    pub composite: f64,
}

impl ScoreReport {
    pub fn get(&self, maneuver: Maneuver) -> u8 {
        match maneuver {
            Maneuver::HardBrake => self.hard_brake,
            Maneuver::Acceleration => self.acceleration,
            Maneuver::Turning => self.turning,
            Maneuver::Speeding => self.speeding,
        }
    }
}

/// One row of a population score table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentScore {
    pub agent_id: String,
    pub hard_brake: u8,
    pub acceleration: u8,
    pub turning: u8,
    pub speeding: u8,
    pub composite: f64,
}

impl AgentScore {
    pub fn new(agent_id: &str, report: &ScoreReport) -> Self {
        AgentScore {
            agent_id: agent_id.to_string(),
            hard_brake: report.hard_brake,
            acceleration: report.acceleration,
            turning: report.turning,
            speeding: report.speeding,
            composite: report.composite,
        }
    }
}
