//! Population-relative safety scoring.
//!
//! Maneuver counts are normalized by drive time, compared against the
//! population mean and standard deviation, bucketed into 1–5 scores and
//! combined with [`crate::config::ScoringWeights`].

pub mod analyzer;
pub mod baseline;
pub mod grade;
pub mod types;
pub mod utility;

pub use analyzer::{get_scores, load_population, score_agent, score_all, screen_population};
pub use baseline::PopulationBaseline;
pub use types::{AgentScore, Maneuver, RateVector, ScoreReport};
