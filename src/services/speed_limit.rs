//! Trait and types for posted speed-limit lookups along a trace.

use anyhow::Result;

/// Posted limits (m/s) looked up at a subset of a trace's samples.
///
/// `limits[k]` was looked up at sample `call_indices[k]`. Between lookups the
/// last known limit persists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpeedLimitSeries {
    pub limits: Vec<f64>,
    pub call_indices: Vec<usize>,
}

impl SpeedLimitSeries {
    pub fn push(&mut self, index: usize, limit: f64) {
        self.call_indices.push(index);
        self.limits.push(limit);
    }

    /// `true` when there is nothing to compare speeds against.
    pub fn is_empty(&self) -> bool {
        self.limits.is_empty() || self.call_indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.limits.len().min(self.call_indices.len())
    }
}

/// Bounds the number of lookups made for one trace.
#[derive(Debug, Clone, Copy)]
pub struct LookupPolicy {
    /// Maximum samples between two lookups.
    pub stride: usize,
    /// Speed change (m/s) since the previous lookup that triggers a new one.
    pub speed_delta: f64,
}

/// Picks the sample indices to look up: the first sample, then whenever
/// `stride` samples have passed or the speed moved by more than
/// `speed_delta` since the last lookup.
pub fn plan_lookups(speed: &[f64], policy: LookupPolicy) -> Vec<usize> {
    let mut indices = Vec::new();
    let Some(&first) = speed.first() else {
        return indices;
    };
    indices.push(0);
    let (mut last_index, mut last_speed) = (0, first);
    for (i, &s) in speed.iter().enumerate().skip(1) {
        if i - last_index >= policy.stride.max(1) || (s - last_speed).abs() > policy.speed_delta {
            indices.push(i);
            last_index = i;
            last_speed = s;
        }
    }
    indices
}

/// Abstraction over a posted speed-limit provider.
///
/// Implementations may be slow and may fail; callers treat a failure as "no
/// limit data" for that trace.
#[async_trait::async_trait]
pub trait SpeedLimitService: Send + Sync {
    async fn path_speed_limit(&self, lat: &[f64], lon: &[f64], speed: &[f64])
    -> Result<SpeedLimitSeries>;
}

/// Used when no provider is configured: every trace gets an empty series.
pub struct NoSpeedLimits;

#[async_trait::async_trait]
impl SpeedLimitService for NoSpeedLimits {
    async fn path_speed_limit(
        &self,
        _lat: &[f64],
        _lon: &[f64],
        _speed: &[f64],
    ) -> Result<SpeedLimitSeries> {
        Ok(SpeedLimitSeries::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: LookupPolicy = LookupPolicy {
        stride: 3,
        speed_delta: 4.0,
    };

    #[test]
    fn test_plan_lookups_by_stride() {
        let speed = [10.0; 8];
        assert_eq!(plan_lookups(&speed, POLICY), vec![0, 3, 6]);
    }

    #[test]
    fn test_plan_lookups_on_speed_change() {
        let speed = [10.0, 10.0, 20.0, 20.0, 20.0, 20.0];
        assert_eq!(plan_lookups(&speed, POLICY), vec![0, 2, 5]);
    }

    #[test]
    fn test_plan_lookups_empty() {
        assert!(plan_lookups(&[], POLICY).is_empty());
        assert_eq!(plan_lookups(&[3.0], POLICY), vec![0]);
    }

    #[test]
    fn test_series_push_keeps_alignment() {
        let mut series = SpeedLimitSeries::default();
        assert!(series.is_empty());
        series.push(0, 13.4);
        series.push(12, 24.6);
        assert_eq!(series.len(), 2);
        assert_eq!(series.call_indices, vec![0, 12]);
        assert_eq!(series.limits, vec![13.4, 24.6]);
    }

    #[tokio::test]
    async fn test_no_speed_limits_is_empty() {
        let series = NoSpeedLimits
            .path_speed_limit(&[42.0], &[-71.0], &[10.0])
            .await
            .unwrap();
        assert!(series.is_empty());
    }
}
