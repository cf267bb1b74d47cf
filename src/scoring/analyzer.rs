use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{ScoringConfig, ScoringWeights};
use crate::error::ScoreError;
use crate::scoring::baseline::PopulationBaseline;
use crate::scoring::grade::{score_one, weight_score};
use crate::scoring::types::{AgentScore, Maneuver, RateVector, ScoreReport};
use crate::stats::AgentStats;

/// Reads every row of a population CSV.
pub fn load_population(path: impl AsRef<Path>) -> Result<Vec<AgentStats>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: AgentStats = result.with_context(|| format!("reading {}", path.display()))?;
        rows.push(record);
    }
    debug!(path = %path.display(), rows = rows.len(), "Population loaded");
    Ok(rows)
}

fn grade_rates(
    rates: &RateVector,
    baseline: &PopulationBaseline,
    weights: &ScoringWeights,
) -> Result<ScoreReport, ScoreError> {
    let score = |m: Maneuver| {
        let stats = baseline.get(m);
        score_one(rates.get(m), stats.mean, stats.std)
            .map_err(|_| ScoreError::DegenerateStatistics(m.to_string()))
    };

    let hard_brake = score(Maneuver::HardBrake)?;
    let acceleration = score(Maneuver::Acceleration)?;
    let turning = score(Maneuver::Turning)?;
    let speeding = score(Maneuver::Speeding)?;

    Ok(ScoreReport {
        hard_brake,
        acceleration,
        turning,
        speeding,
        composite: weight_score(hard_brake, acceleration, turning, speeding, weights),
    })
}

/// Scores one agent against a population baseline.
///
/// # Errors
///
/// [`ScoreError::InsufficientSample`] when the agent drove less than
/// `config.min_drive_time`; checked before anything else.
#[tracing::instrument(skip_all, fields(agent_id = %stats.agent_id))]
pub fn get_scores(
    stats: &AgentStats,
    baseline: &PopulationBaseline,
    config: &ScoringConfig,
) -> Result<ScoreReport, ScoreError> {
    if !(stats.drive_time >= config.min_drive_time) {
        return Err(ScoreError::InsufficientSample {
            drive_time: stats.drive_time,
            minimum: config.min_drive_time,
        });
    }
    config.weights.validate()?;

    let rates = RateVector::from_stats(stats)
        .ok_or_else(|| ScoreError::NoDriveTime(stats.agent_id.clone()))?;
    let report = grade_rates(&rates, baseline, &config.weights)?;
    debug!(composite = report.composite, "Agent scored");
    Ok(report)
}

/// Looks `agent_id` up in `population` and scores it against the baseline of
/// the whole population.
pub fn score_agent(
    agent_id: &str,
    population: &[AgentStats],
    config: &ScoringConfig,
) -> Result<(AgentStats, ScoreReport), ScoreError> {
    let stats = population
        .iter()
        .find(|row| row.agent_id == agent_id)
        .ok_or_else(|| ScoreError::UnknownAgent(agent_id.to_string()))?;
    let baseline = PopulationBaseline::from_population(population)?;
    let report = get_scores(stats, &baseline, config)?;
    Ok((stats.clone(), report))
}

/// Scores every member of `population` against the population's own baseline.
///
/// No minimum drive time applies; rows without drive time are left out.
#[tracing::instrument(skip_all, fields(agents = population.len()))]
pub fn score_all(
    population: &[AgentStats],
    weights: &ScoringWeights,
) -> Result<Vec<AgentScore>, ScoreError> {
    weights.validate()?;
    let baseline = PopulationBaseline::from_population(population)?;

    let mut scores = Vec::with_capacity(population.len());
    for row in population {
        let Some(rates) = RateVector::from_stats(row) else {
            continue;
        };
        let report = grade_rates(&rates, &baseline, weights)?;
        scores.push(AgentScore::new(&row.agent_id, &report));
    }
    info!(scored = scores.len(), "Population scored");
    Ok(scores)
}

/// Copies population rows whose drive time is strictly above `min_drive_time`
/// from `input` to a fresh CSV at `output`. Returns the number of rows kept.
pub fn screen_population(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    min_drive_time: f64,
) -> Result<usize> {
    let rows = load_population(input)?;
    let total = rows.len();
    let output = output.as_ref();

    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("creating {}", output.display()))?;
    let mut kept = 0;
    for row in rows.iter().filter(|r| r.drive_time > min_drive_time) {
        writer.serialize(row)?;
        kept += 1;
    }
    writer.flush()?;

    info!(total, kept, min_drive_time, "Population screened");
    Ok(kept)
}
