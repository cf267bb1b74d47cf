//! Runtime configuration: detection thresholds, scoring weights and
//! collaborator endpoints.
//!
//! Everything has a canonical default, so the config file is optional and may
//! override any subset of fields:
//! ```json
//! {
//!   "scoring": { "min_drive_time": 72000 },
//!   "services": { "trip_store_url": "https://trips.example.com" }
//! }
//! ```
//! Credentials never live here; they are read from the environment by the
//! binary and handed to the collaborator clients.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ScoreError;
use crate::services::speed_limit::LookupPolicy;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub preprocess: PreprocessConfig,
    pub detection: DetectionConfig,
    pub scoring: ScoringConfig,
    pub services: ServiceConfig,
}

impl Config {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        Self::from_json(&content).with_context(|| format!("parsing config {path}"))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.scoring.weights.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Trips with fewer samples are excluded before detection.
    pub min_samples: usize,
    /// Recomputed speeds below this (m/s) are clamped to zero.
    pub min_speed: f64,
    /// Box filter width applied to clean speed traces.
    pub smoothing_window: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            min_samples: 30,
            min_speed: 0.1,
            smoothing_window: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub turn: TurnThresholds,
    pub acceleration: AccelerationThresholds,
    pub hard_brake: HardBrakeThresholds,
}

/// Heading deltas are in degrees per sample, speeds in m/s.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TurnThresholds {
    pub start_min: f64,
    pub start_max: f64,
    pub settle_max: f64,
    /// Net heading change below this is noise, not a turn.
    pub min_angle: f64,
    /// Net heading change above this is treated as a reversal artifact.
    pub max_angle: f64,
    /// ~15 mph.
    pub fast_turn_speed: f64,
    /// Turn intervals averaging above this are discarded from turning speed.
    pub max_turning_speed: f64,
}

impl Default for TurnThresholds {
    fn default() -> Self {
        Self {
            start_min: 19.0,
            start_max: 70.0,
            settle_max: 5.0,
            min_angle: 30.0,
            max_angle: 150.0,
            fast_turn_speed: 6.7,
            max_turning_speed: 100.0,
        }
    }
}

/// Speed deltas are in m/s per sample, durations in seconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccelerationThresholds {
    pub start_min: f64,
    pub start_max: f64,
    pub end_max: f64,
    pub min_duration: f64,
}

impl Default for AccelerationThresholds {
    fn default() -> Self {
        Self {
            start_min: 3.0,
            start_max: 9.0,
            end_max: 2.0,
            min_duration: 2.0,
        }
    }
}

/// Deceleration band in m/s².
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HardBrakeThresholds {
    pub min_rate: f64,
    pub max_rate: f64,
}

impl Default for HardBrakeThresholds {
    fn default() -> Self {
        Self {
            min_rate: 5.0,
            max_rate: 8.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Agents with less total drive time (seconds) are not scored. 10 hours.
    pub min_drive_time: f64,
    pub weights: ScoringWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_drive_time: 36_000.0,
            weights: ScoringWeights::default(),
        }
    }
}

/// Convex weights for the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub hard_brake: f64,
    pub acceleration: f64,
    pub turning: f64,
    pub speeding: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            hard_brake: 0.30,
            acceleration: 0.15,
            turning: 0.15,
            speeding: 0.40,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.hard_brake + self.acceleration + self.turning + self.speeding
    }

    /// Rejects negative weights and weights that do not sum to 1.
    pub fn validate(&self) -> Result<(), ScoreError> {
        let parts = [self.hard_brake, self.acceleration, self.turning, self.speeding];
        let sum = self.sum();
        if parts.iter().any(|w| *w < 0.0 || !w.is_finite()) || (sum - 1.0).abs() > 1e-9 {
            return Err(ScoreError::InvalidWeights(sum));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub trip_store_url: String,
    pub speed_limit_url: String,
    /// Maximum samples between two speed-limit lookups.
    pub lookup_stride: usize,
    /// A speed change (m/s) larger than this since the last lookup forces a new one.
    pub speed_delta: f64,
    /// Concurrent speed-limit lookups across trips.
    pub concurrency: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            trip_store_url: "http://localhost:8080".to_string(),
            speed_limit_url: "https://roads.googleapis.com".to_string(),
            lookup_stride: 30,
            speed_delta: 4.0,
            concurrency: 5,
        }
    }
}

impl ServiceConfig {
    pub fn lookup_policy(&self) -> LookupPolicy {
        LookupPolicy {
            stride: self.lookup_stride,
            speed_delta: self.speed_delta,
        }
    }
}
