//! Trace cleaning: speed and heading gap filling, speed smoothing and the
//! exclusion rules applied before detection.

use thiserror::Error;
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::trace::{CleanTrace, CleanTripSet, Trace, TripSet};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Why a trip was dropped before detection. Not an error: excluded trips are
/// logged and skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    #[error("only {samples} samples, need {required}")]
    TooShort { samples: usize, required: usize },
    #[error("heading never known")]
    HeadingUnknown,
    #[error("heading constant zero")]
    HeadingZero,
}

/// Great-circle distance in metres.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Centred box filter with zero padding; output has the input's length.
pub fn smooth(values: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 {
        return values.to_vec();
    }
    let n = values.len() as isize;
    let w = window as isize;
    // even widths put the extra tap on the left
    let left = (w - 1) - (w - 1) / 2;
    (0..n)
        .map(|i| {
            let lo = (i - left).max(0);
            let hi = (i - left + w).min(n);
            values[lo as usize..hi as usize].iter().sum::<f64>() / window as f64
        })
        .collect()
}

/// Replaces missing or non-positive speeds with the speed implied by the
/// positions of neighbouring samples.
///
/// Traces that needed no recomputation are smoothed; repaired traces are
/// returned as repaired.
pub fn fill_speed(
    speed: &[Option<f64>],
    time: &[f64],
    lat: &[f64],
    lon: &[f64],
    config: &PreprocessConfig,
) -> Vec<f64> {
    let n = speed.len();
    let mut filled = Vec::with_capacity(n);
    let mut recomputed = false;

    for i in 0..n.saturating_sub(1) {
        match speed[i] {
            Some(s) if s > 0.0 => filled.push(s),
            _ => {
                recomputed = true;
                let dt = (time[i + 1] - time[i]).max(1.0);
                let res = haversine(lat[i], lon[i], lat[i + 1], lon[i + 1]) / dt;
                filled.push(if res < config.min_speed { 0.0 } else { res });
            }
        }
    }

    let last = match speed.last().copied().flatten() {
        Some(s) if s > 0.0 => s,
        _ => filled.last().copied().unwrap_or(0.0),
    };
    if n > 0 {
        filled.push(last);
    }

    if recomputed {
        filled
    } else {
        smooth(&filled, config.smoothing_window)
    }
}

/// Fills unknown headings from their neighbours.
///
/// Returns `None` when no heading is ever known, in which case the trip is
/// unusable for turn detection.
pub fn fill_heading(heading: &[Option<f64>]) -> Option<Vec<f64>> {
    let n = heading.len();
    let mut out = heading.to_vec();
    let mut leading_unknown = out.first().is_some_and(Option::is_none);

    for i in 0..n.saturating_sub(1) {
        if leading_unknown {
            if let Some(h) = out[i] {
                out[..i].iter_mut().for_each(|v| *v = Some(h));
                leading_unknown = false;
            }
        } else if out[i].is_none() {
            let prev = out[i - 1]?;
            out[i] = Some(match out[i + 1] {
                Some(next) => (prev + next) / 2.0,
                None => prev,
            });
        }
    }

    if leading_unknown {
        return None;
    }
    if out.last().is_some_and(Option::is_none) {
        let prev = n.checked_sub(2).and_then(|i| out[i])?;
        out[n - 1] = Some(prev);
    }
    out.into_iter().collect()
}

/// Cleans one trip or reports why it cannot be used.
pub fn clean_trace(trace: &Trace, config: &PreprocessConfig) -> Result<CleanTrace, Exclusion> {
    if trace.len() < config.min_samples {
        return Err(Exclusion::TooShort {
            samples: trace.len(),
            required: config.min_samples,
        });
    }
    let speed = fill_speed(&trace.speed, &trace.time, &trace.lat, &trace.lon, config);
    let heading = fill_heading(&trace.heading).ok_or(Exclusion::HeadingUnknown)?;
    if heading.iter().sum::<f64>() / heading.len() as f64 == 0.0 {
        return Err(Exclusion::HeadingZero);
    }
    Ok(CleanTrace {
        lat: trace.lat.clone(),
        lon: trace.lon.clone(),
        speed,
        heading,
        time: trace.time.clone(),
    })
}

/// Cleans every trip of an agent, dropping the unusable ones.
#[tracing::instrument(skip_all, fields(trips = trips.len()))]
pub fn organize_trips(trips: TripSet, config: &PreprocessConfig) -> CleanTripSet {
    let mut clean = CleanTripSet::new();
    for (trip_id, trace) in trips {
        match clean_trace(&trace, config) {
            Ok(c) => {
                clean.insert(trip_id, c);
            }
            Err(reason) => debug!(trip_id = %trip_id, %reason, "Trip excluded"),
        }
    }
    debug!(kept = clean.len(), "Trips organized");
    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cfg() -> PreprocessConfig {
        PreprocessConfig::default()
    }

    #[test]
    fn test_haversine_one_degree_latitude() {
        let d = haversine(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 1.0, "got {d}");
        assert_eq!(haversine(42.0, -71.0, 42.0, -71.0), 0.0);
    }

    #[test]
    fn test_smooth_same_length_zero_padded() {
        let out = smooth(&[3.0, 3.0, 3.0, 3.0], 3);
        assert_eq!(out.len(), 4);
        assert!((out[0] - 2.0).abs() < 1e-12);
        assert!((out[1] - 3.0).abs() < 1e-12);
        assert!((out[2] - 3.0).abs() < 1e-12);
        assert!((out[3] - 2.0).abs() < 1e-12);
        assert_eq!(smooth(&[6.0], 3), vec![2.0]);
    }

    #[test]
    fn test_fill_speed_clean_trace_is_smoothed() {
        let speed = [Some(3.0), Some(6.0), Some(9.0)];
        let out = fill_speed(&speed, &[0.0, 1.0, 2.0], &[0.0; 3], &[0.0; 3], &cfg());
        assert!((out[0] - 3.0).abs() < 1e-12);
        assert!((out[1] - 6.0).abs() < 1e-12);
        assert!((out[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_fill_speed_recomputes_and_skips_smoothing() {
        // 0.0001 degrees of latitude is ~11.1 m
        let lat = [0.0, 0.0001, 0.0002];
        let speed = [None, Some(10.0), Some(10.0)];
        let out = fill_speed(&speed, &[0.0, 1.0, 2.0], &lat, &[0.0; 3], &cfg());
        assert!((out[0] - 11.1195).abs() < 1e-3, "got {}", out[0]);
        assert_eq!(out[1], 10.0);
        assert_eq!(out[2], 10.0);
    }

    #[test]
    fn test_fill_speed_zero_time_delta_uses_one_second() {
        let lat = [0.0, 0.0001, 0.0002];
        let speed = [Some(0.0), Some(10.0), Some(10.0)];
        let out = fill_speed(&speed, &[5.0, 5.0, 6.0], &lat, &[0.0; 3], &cfg());
        assert!((out[0] - 11.1195).abs() < 1e-3);
    }

    #[test]
    fn test_fill_speed_clamps_slow_recomputation_to_zero() {
        let speed = [None, Some(4.0), Some(4.0)];
        let out = fill_speed(&speed, &[0.0, 1.0, 2.0], &[0.0; 3], &[0.0; 3], &cfg());
        assert_eq!(out[0], 0.0);
    }

    #[test]
    fn test_fill_speed_last_copies_previous() {
        let speed = [Some(-1.0), Some(8.0), None];
        let out = fill_speed(&speed, &[0.0, 1.0, 2.0], &[0.0; 3], &[0.0; 3], &cfg());
        assert_eq!(out, vec![0.0, 8.0, 8.0]);
    }

    #[test]
    fn test_fill_speed_single_sample() {
        assert_eq!(fill_speed(&[None], &[0.0], &[0.0], &[0.0], &cfg()), vec![0.0]);
    }

    #[test]
    fn test_fill_heading_backfills_leading_run() {
        let out = fill_heading(&[None, None, Some(90.0), Some(92.0)]).unwrap();
        assert_eq!(out, vec![90.0, 90.0, 90.0, 92.0]);
    }

    #[test]
    fn test_fill_heading_interior_gaps() {
        let out = fill_heading(&[Some(10.0), None, Some(20.0), None, None, Some(50.0), None])
            .unwrap();
        assert_eq!(out, vec![10.0, 15.0, 20.0, 20.0, 35.0, 50.0, 50.0]);
    }

    #[test]
    fn test_fill_heading_never_known() {
        assert_eq!(fill_heading(&[None, None, None]), None);
        // the only known value is the last sample, which the back-fill never reaches
        assert_eq!(fill_heading(&[None, None, Some(10.0)]), None);
    }

    fn trace_with(n: usize, heading: Option<f64>) -> Trace {
        Trace::new(
            "trip",
            (0..n).map(|i| 42.0 + i as f64 * 1e-4).collect(),
            vec![-71.0; n],
            vec![Some(10.0); n],
            vec![heading; n],
            (0..n).map(|i| i as f64).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_clean_trace_exclusions() {
        assert_eq!(
            clean_trace(&trace_with(29, Some(90.0)), &cfg()),
            Err(Exclusion::TooShort {
                samples: 29,
                required: 30
            })
        );
        assert_eq!(
            clean_trace(&trace_with(30, None), &cfg()),
            Err(Exclusion::HeadingUnknown)
        );
        assert_eq!(
            clean_trace(&trace_with(30, Some(0.0)), &cfg()),
            Err(Exclusion::HeadingZero)
        );
        assert!(clean_trace(&trace_with(30, Some(90.0)), &cfg()).is_ok());
    }

    #[test]
    fn test_organize_trips_drops_unusable() {
        let mut trips = TripSet::new();
        trips.insert("short".into(), trace_with(5, Some(90.0)));
        trips.insert("blind".into(), trace_with(40, None));
        trips.insert("good".into(), trace_with(40, Some(90.0)));
        let clean = organize_trips(trips, &cfg());
        assert_eq!(clean.keys().collect::<Vec<_>>(), vec!["good"]);
    }

    proptest! {
        #[test]
        fn fill_speed_never_leaves_gaps_or_negatives(
            samples in prop::collection::vec(
                (prop::option::of(-5.0f64..40.0), 0.0f64..3.0, -0.001f64..0.001),
                1..60,
            )
        ) {
            let n = samples.len();
            let speed: Vec<Option<f64>> = samples.iter().map(|s| s.0).collect();
            let mut t = 0.0;
            let time: Vec<f64> = samples.iter().map(|s| { t += s.1.floor(); t }).collect();
            let lat: Vec<f64> = samples.iter().map(|s| 42.0 + s.2).collect();
            let lon = vec![-71.0; n];

            let out = fill_speed(&speed, &time, &lat, &lon, &cfg());
            prop_assert_eq!(out.len(), n);
            prop_assert!(out.iter().all(|s| *s >= 0.0 && s.is_finite()));
        }

        #[test]
        fn fill_heading_output_complete_when_resolvable(
            heading in prop::collection::vec(prop::option::of(0.0f64..360.0), 2..60)
        ) {
            let n = heading.len();
            let resolvable = heading[..n - 1].iter().any(Option::is_some);
            match fill_heading(&heading) {
                Some(out) => {
                    prop_assert!(resolvable);
                    prop_assert_eq!(out.len(), n);
                    prop_assert!(out.iter().all(|h| (0.0..360.0).contains(h)));
                }
                None => prop_assert!(!resolvable),
            }
        }
    }
}
