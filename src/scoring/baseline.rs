use serde::Serialize;
use tracing::warn;

use crate::error::ScoreError;
use crate::scoring::types::{Maneuver, RateVector};
use crate::scoring::utility::{mean, stddev};
use crate::stats::AgentStats;

/// Population mean and standard deviation of one maneuver rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateStats {
    pub mean: f64,
    pub std: f64,
}

impl RateStats {
    fn of(values: &[f64]) -> Self {
        let m = mean(values);
        RateStats {
            mean: m,
            std: stddev(values, m),
        }
    }
}

/// Per-maneuver rate statistics of a population sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationBaseline {
    pub hard_brake: RateStats,
    pub acceleration: RateStats,
    pub turning: RateStats,
    pub speeding: RateStats,
    /// Rows that contributed.
    pub agents: usize,
}

impl PopulationBaseline {
    /// Computes per-maneuver rate mean and population standard deviation.
    ///
    /// Rows without positive drive time cannot be normalized and are skipped.
    pub fn from_population(population: &[AgentStats]) -> Result<Self, ScoreError> {
        let mut rates: Vec<RateVector> = Vec::with_capacity(population.len());
        for row in population {
            match RateVector::from_stats(row) {
                Some(r) => rates.push(r),
                None => warn!(agent_id = %row.agent_id, "Skipping population row without drive time"),
            }
        }
        if rates.is_empty() {
            return Err(ScoreError::EmptyPopulation);
        }

        let column = |m: Maneuver| {
            let values: Vec<f64> = rates.iter().map(|r| r.get(m)).collect();
            RateStats::of(&values)
        };

        Ok(PopulationBaseline {
            hard_brake: column(Maneuver::HardBrake),
            acceleration: column(Maneuver::Acceleration),
            turning: column(Maneuver::Turning),
            speeding: column(Maneuver::Speeding),
            agents: rates.len(),
        })
    }

    pub fn get(&self, maneuver: Maneuver) -> RateStats {
        match maneuver {
            Maneuver::HardBrake => self.hard_brake,
            Maneuver::Acceleration => self.acceleration,
            Maneuver::Turning => self.turning,
            Maneuver::Speeding => self.speeding,
        }
    }
}
