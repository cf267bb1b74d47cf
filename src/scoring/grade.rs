use crate::config::ScoringWeights;
use crate::error::ScoreError;

/// Converts a maneuver rate into a 1–5 safety score by its z-score against
/// the population.
///
/// | z            | Score |
/// |--------------|-------|
/// | >= 2         | 1     |
/// | [1, 2)       | 2     |
/// | [0, 1)       | 3     |
/// | [-1, 0)      | 4     |
/// | < -1         | 5     |
///
/// # Errors
///
/// [`ScoreError::DegenerateStatistics`] if `std` is not a positive number.
pub fn score_one(value: f64, mean: f64, std: f64) -> Result<u8, ScoreError> {
    if !(std > 0.0 && std.is_finite()) {
        return Err(ScoreError::DegenerateStatistics(format!("std = {std}")));
    }
    let z = (value - mean) / std;
    Ok(match z {
        z if z >= 2.0 => 1,
        z if z >= 1.0 => 2,
        z if z >= 0.0 => 3,
        z if z >= -1.0 => 4,
        _ => 5,
    })
}

/// Weighted composite of the four maneuver scores.
pub fn weight_score(
    hard_brake: u8,
    acceleration: u8,
    turning: u8,
    speeding: u8,
    weights: &ScoringWeights,
) -> f64 {
    weights.hard_brake * f64::from(hard_brake)
        + weights.acceleration * f64::from(acceleration)
        + weights.turning * f64::from(turning)
        + weights.speeding * f64::from(speeding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_score_boundaries() {
        assert_eq!(score_one(3.0, 1.0, 1.0), Ok(1));
        assert_eq!(score_one(2.9, 1.0, 1.0), Ok(2));
        assert_eq!(score_one(2.0, 1.0, 1.0), Ok(2));
        assert_eq!(score_one(1.9, 1.0, 1.0), Ok(3));
        assert_eq!(score_one(1.0, 1.0, 1.0), Ok(3));
        assert_eq!(score_one(0.9, 1.0, 1.0), Ok(4));
        assert_eq!(score_one(0.0, 1.0, 1.0), Ok(4));
        assert_eq!(score_one(-0.1, 1.0, 1.0), Ok(5));
    }

    #[test]
    fn test_zero_std_is_degenerate() {
        assert!(matches!(
            score_one(1.0, 1.0, 0.0),
            Err(ScoreError::DegenerateStatistics(_))
        ));
        assert!(score_one(1.0, 1.0, f64::NAN).is_err());
        assert!(score_one(1.0, 1.0, -2.0).is_err());
    }

    #[test]
    fn test_weight_score() {
        let w = ScoringWeights::default();
        assert!((weight_score(5, 5, 5, 5, &w) - 5.0).abs() < 1e-12);
        assert!((weight_score(1, 1, 1, 1, &w) - 1.0).abs() < 1e-12);
        // 0.30*1 + 0.15*2 + 0.15*3 + 0.40*4
        assert!((weight_score(1, 2, 3, 4, &w) - 2.65).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn score_is_scale_invariant(
            value in -1000.0f64..1000.0,
            mean in -1000.0f64..1000.0,
            std in 0.01f64..100.0,
            k in prop::sample::select(vec![0.5f64, 2.0, 4.0, 1024.0]),
        ) {
            // powers of two scale exactly, so z is bit-identical
            prop_assert_eq!(
                score_one(value, mean, std),
                score_one(value * k, mean * k, std * k)
            );
        }

        #[test]
        fn score_monotonic_decreasing(
            a in -10.0f64..10.0,
            b in -10.0f64..10.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(score_one(lo, 0.0, 1.0).unwrap() >= score_one(hi, 0.0, 1.0).unwrap());
        }

        #[test]
        fn composite_within_score_range(
            s in prop::array::uniform4(1u8..=5),
        ) {
            let c = weight_score(s[0], s[1], s[2], s[3], &ScoringWeights::default());
            let min = *s.iter().min().unwrap() as f64;
            let max = *s.iter().max().unwrap() as f64;
            prop_assert!(c >= min - 1e-9 && c <= max + 1e-9);
        }
    }
}
