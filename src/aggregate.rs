//! Per-agent aggregation of maneuver events across trips.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{Instrument, debug, info, warn};

use crate::config::DetectionConfig;
use crate::parser::TripIndex;
use crate::detectors::{AccelerationDetector, HardBrakeDetector, SpeedingDetector, TurnDetector};
use crate::scoring::utility::mean;
use crate::services::speed_limit::{SpeedLimitSeries, SpeedLimitService};
use crate::trace::{CleanTrace, CleanTripSet};

/// Summed detector output for all trips of one agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManeuverTotals {
    pub trips: usize,
    pub turns: usize,
    pub fast_turns: usize,
    pub hard_brakes: usize,
    pub accelerations: usize,
    pub speeding_events: usize,
    pub over_ratio_sum: f64,
    /// Seconds.
    pub speeding_duration: f64,
    /// Seconds.
    pub drive_time: f64,
    /// Mean speed of every confirmed turn below the plausibility cap.
    pub turning_speeds: Vec<f64>,
}

impl ManeuverTotals {
    pub fn mean_turning_speed(&self) -> f64 {
        mean(&self.turning_speeds)
    }

    /// Average `(speed - limit) / limit` over speeding events, 0 with none.
    pub fn mean_over_ratio(&self) -> f64 {
        if self.speeding_events == 0 {
            0.0
        } else {
            self.over_ratio_sum / self.speeding_events as f64
        }
    }
}

/// Runs the four detectors over every trip of an agent.
pub struct TripAggregator {
    turn: TurnDetector,
    acceleration: AccelerationDetector,
    hard_brake: HardBrakeDetector,
    speeding: SpeedingDetector,
    max_turning_speed: f64,
}

impl TripAggregator {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            turn: TurnDetector::new(config.turn.clone()),
            acceleration: AccelerationDetector::new(config.acceleration.clone()),
            hard_brake: HardBrakeDetector::new(config.hard_brake.clone()),
            speeding: SpeedingDetector::new(),
            max_turning_speed: config.turn.max_turning_speed,
        }
    }

    /// Adds one trip's events to `totals`.
    pub fn add_trip(
        &self,
        totals: &mut ManeuverTotals,
        trace: &CleanTrace,
        limits: &SpeedLimitSeries,
    ) {
        let turns = self.turn.detect(&trace.heading);
        let fast_turns = self.turn.count_fast(&turns, &trace.speed);
        let hard_brakes = self.hard_brake.detect(&trace.speed, &trace.time);
        let accelerations = self.acceleration.detect(&trace.speed, &trace.time);
        let speeding = self.speeding.detect(&trace.speed, &trace.time, limits);

        totals.trips += 1;
        totals.turns += turns.count();
        totals.fast_turns += fast_turns;
        totals.turning_speeds.extend(
            turns
                .speeds(&trace.speed)
                .into_iter()
                .filter(|s| *s < self.max_turning_speed),
        );
        totals.hard_brakes += hard_brakes.count();
        totals.accelerations += accelerations.count();
        totals.speeding_events += speeding.events;
        totals.over_ratio_sum += speeding.over_ratio_sum;
        totals.speeding_duration += speeding.duration;
        totals.drive_time += trace.drive_time();
    }

    /// Aggregates all trips; trips without a limit series get no speeding events.
    #[tracing::instrument(skip_all, fields(trips = trips.len()))]
    pub fn aggregate(
        &self,
        trips: &CleanTripSet,
        limits: &HashMap<String, SpeedLimitSeries>,
    ) -> ManeuverTotals {
        let empty = SpeedLimitSeries::default();
        let mut totals = ManeuverTotals::default();
        for (trip_id, trace) in trips {
            self.add_trip(&mut totals, trace, limits.get(trip_id).unwrap_or(&empty));
        }
        info!(
            trips = totals.trips,
            turns = totals.turns,
            fast_turns = totals.fast_turns,
            hard_brakes = totals.hard_brakes,
            accelerations = totals.accelerations,
            speeding_events = totals.speeding_events,
            drive_time = totals.drive_time,
            "Trips aggregated"
        );
        totals
    }
}

/// Splits cleaned trips into one set per agent of `index`.
///
/// Agents without a kept trip are dropped. Trips no agent claims are counted
/// and logged.
pub fn group_by_agent(clean: &CleanTripSet, index: TripIndex) -> Vec<(String, CleanTripSet)> {
    let mut claimed = HashSet::new();
    let groups: Vec<(String, CleanTripSet)> = index
        .into_iter()
        .map(|(agent, trip_ids)| {
            let trips: CleanTripSet = trip_ids
                .into_iter()
                .filter_map(|id| {
                    let trace = clean.get(&id)?.clone();
                    claimed.insert(id.clone());
                    Some((id, trace))
                })
                .collect();
            (agent, trips)
        })
        .filter(|(_, trips)| !trips.is_empty())
        .collect();

    let unclaimed = clean.len() - claimed.len();
    if unclaimed > 0 {
        warn!(unclaimed, "Cleaned trips not listed for any agent in the trip index");
    }
    groups
}

pub fn aggregate_trips(
    trips: &CleanTripSet,
    limits: &HashMap<String, SpeedLimitSeries>,
    config: &DetectionConfig,
) -> ManeuverTotals {
    TripAggregator::new(config).aggregate(trips, limits)
}

/// Looks up speed limits for every trip, at most `concurrency` at a time.
///
/// A failed lookup is logged and leaves the trip without limits.
#[tracing::instrument(skip(service, trips), fields(trips = trips.len()))]
pub async fn lookup_speed_limits(
    service: Arc<dyn SpeedLimitService>,
    trips: &CleanTripSet,
    concurrency: usize,
) -> HashMap<String, SpeedLimitSeries> {
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(trips.len());

    for (trip_id, trace) in trips {
        let sem = semaphore.clone();
        let service = service.clone();
        let (lat, lon, speed) = (trace.lat.clone(), trace.lon.clone(), trace.speed.clone());
        let span = tracing::debug_span!("speed_limit_lookup", trip_id = %trip_id);

        let task = tokio::spawn(
            async move {
                let _permit = sem.acquire().await.ok()?;
                match service.path_speed_limit(&lat, &lon, &speed).await {
                    Ok(series) => {
                        debug!(lookups = series.len(), "Speed limits fetched");
                        Some(series)
                    }
                    Err(e) => {
                        warn!(error = %e, "Speed limit lookup failed");
                        None
                    }
                }
            }
            .instrument(span),
        );
        tasks.push((trip_id.clone(), task));
    }

    let mut limits = HashMap::new();
    for (trip_id, task) in tasks {
        match task.await {
            Ok(Some(series)) => {
                limits.insert(trip_id, series);
            }
            Ok(None) => {}
            Err(e) => warn!(trip_id = %trip_id, error = %e, "Speed limit task failed"),
        }
    }
    limits
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn trace(heading: Vec<f64>, speed: Vec<f64>) -> CleanTrace {
        let n = heading.len();
        CleanTrace {
            lat: vec![42.0; n],
            lon: vec![-71.0; n],
            speed,
            heading,
            time: (0..n).map(|i| 1000.0 + i as f64).collect(),
        }
    }

    fn turning_trip(speed: f64) -> CleanTrace {
        let mut heading = vec![0.0, 0.0, 0.0, 45.0, 90.0];
        heading.extend(vec![90.0; 5]);
        trace(heading, vec![speed; 10])
    }

    #[test]
    fn test_group_by_agent() {
        let mut clean = CleanTripSet::new();
        for id in ["t1", "t2", "t3", "t4"] {
            clean.insert(id.into(), turning_trip(8.0));
        }
        let mut index = TripIndex::new();
        index.insert("a1".into(), vec!["t1".into(), "t2".into(), "excluded".into()]);
        index.insert("a2".into(), vec!["t3".into()]);
        index.insert("a3".into(), vec!["excluded".into()]);

        let groups = group_by_agent(&clean, index);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, "a1");
        assert_eq!(groups[0].1.keys().collect::<Vec<_>>(), vec!["t1", "t2"]);
        assert_eq!(groups[1].0, "a2");
        assert_eq!(groups[1].1.len(), 1);
        // t4 belongs to nobody and is left out
        assert!(groups.iter().all(|(_, trips)| !trips.contains_key("t4")));
    }

    #[test]
    fn test_aggregate_sums_trips() {
        let mut trips = CleanTripSet::new();
        trips.insert("a".into(), turning_trip(8.0));
        trips.insert("b".into(), turning_trip(5.0));
        // hard brake at index 1 and a turnless trip
        trips.insert(
            "c".into(),
            trace(vec![90.0; 4], vec![20.0, 20.0, 14.0, 14.0]),
        );

        let totals = aggregate_trips(&trips, &HashMap::new(), &DetectionConfig::default());
        assert_eq!(totals.trips, 3);
        assert_eq!(totals.turns, 2);
        assert_eq!(totals.fast_turns, 1);
        assert_eq!(totals.hard_brakes, 1);
        assert_eq!(totals.accelerations, 0);
        assert_eq!(totals.speeding_events, 0);
        assert_eq!(totals.drive_time, 9.0 + 9.0 + 3.0);
        assert_eq!(totals.turning_speeds, vec![8.0, 5.0]);
        assert_eq!(totals.mean_turning_speed(), 6.5);
    }

    #[test]
    fn test_implausible_turning_speed_excluded() {
        let mut trips = CleanTripSet::new();
        trips.insert("a".into(), turning_trip(120.0));
        let totals = aggregate_trips(&trips, &HashMap::new(), &DetectionConfig::default());
        assert_eq!(totals.turns, 1);
        assert_eq!(totals.fast_turns, 1);
        assert!(totals.turning_speeds.is_empty());
        assert_eq!(totals.mean_turning_speed(), 0.0);
    }

    #[test]
    fn test_speeding_uses_trip_limits() {
        let mut trips = CleanTripSet::new();
        trips.insert("a".into(), trace(vec![90.0; 4], vec![25.0, 25.0, 10.0, 10.0]));
        let mut limits = HashMap::new();
        limits.insert(
            "a".to_string(),
            SpeedLimitSeries {
                limits: vec![20.0],
                call_indices: vec![0],
            },
        );
        let totals = aggregate_trips(&trips, &limits, &DetectionConfig::default());
        assert_eq!(totals.speeding_events, 1);
        assert_eq!(totals.speeding_duration, 2.0);
        assert!((totals.mean_over_ratio() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_mean_over_ratio_without_events() {
        assert_eq!(ManeuverTotals::default().mean_over_ratio(), 0.0);
    }

    struct FixedLimit(f64);

    #[async_trait::async_trait]
    impl SpeedLimitService for FixedLimit {
        async fn path_speed_limit(
            &self,
            _lat: &[f64],
            _lon: &[f64],
            speed: &[f64],
        ) -> Result<SpeedLimitSeries> {
            if speed.len() < 2 {
                anyhow::bail!("trace too short for lookup");
            }
            Ok(SpeedLimitSeries {
                limits: vec![self.0],
                call_indices: vec![0],
            })
        }
    }

    #[tokio::test]
    async fn test_lookup_speed_limits_skips_failures() {
        let mut trips = CleanTripSet::new();
        trips.insert("ok".into(), trace(vec![90.0; 3], vec![10.0; 3]));
        trips.insert("short".into(), trace(vec![90.0], vec![10.0]));

        let limits = lookup_speed_limits(Arc::new(FixedLimit(13.4)), &trips, 2).await;
        assert_eq!(limits.len(), 1);
        assert_eq!(limits["ok"].limits, vec![13.4]);
    }
}
