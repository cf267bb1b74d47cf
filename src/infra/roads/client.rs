use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::fetch::{HttpClient, fetch_json};
use crate::services::speed_limit::{
    LookupPolicy, SpeedLimitSeries, SpeedLimitService, plan_lookups,
};

const KPH_TO_MPS: f64 = 1000.0 / 3600.0;
const MPH_TO_MPS: f64 = 1609.344 / 3600.0;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpeedLimitsResponse {
    #[serde(default)]
    speed_limits: Vec<PostedLimit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostedLimit {
    speed_limit: f64,
    units: String,
}

/// Converts a posted limit to m/s. `None` for unknown units.
pub fn to_meters_per_second(value: f64, units: &str) -> Option<f64> {
    match units.to_ascii_uppercase().as_str() {
        "KPH" => Some(value * KPH_TO_MPS),
        "MPH" => Some(value * MPH_TO_MPS),
        _ => None,
    }
}

fn first_limit(response: SpeedLimitsResponse) -> Option<f64> {
    let limit = response.speed_limits.into_iter().next()?;
    to_meters_per_second(limit.speed_limit, &limit.units)
}

/// Roads-API speed-limit lookups.
///
/// The API key is expected to be injected by the wrapped client
/// ([`crate::fetch::auth::UrlParam`] with `key`).
pub struct HttpSpeedLimits<C> {
    client: C,
    base_url: String,
    policy: LookupPolicy,
}

impl<C: HttpClient> HttpSpeedLimits<C> {
    pub fn new(base_url: &str, client: C, policy: LookupPolicy) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy,
        }
    }

    fn url(&self, lat: f64, lon: f64) -> String {
        format!(
            "{}/v1/speedLimits?path={lat},{lon}&units=KPH",
            self.base_url
        )
    }

    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        let response: SpeedLimitsResponse = fetch_json(&self.client, &self.url(lat, lon)).await?;
        Ok(first_limit(response))
    }
}

#[async_trait]
impl<C: HttpClient> SpeedLimitService for HttpSpeedLimits<C> {
    /// Failed or empty lookups are skipped, so the previous limit persists.
    async fn path_speed_limit(
        &self,
        lat: &[f64],
        lon: &[f64],
        speed: &[f64],
    ) -> Result<SpeedLimitSeries> {
        let mut series = SpeedLimitSeries::default();
        let n = lat.len().min(lon.len()).min(speed.len());

        for i in plan_lookups(&speed[..n], self.policy) {
            match self.lookup(lat[i], lon[i]).await {
                Ok(Some(limit)) => series.push(i, limit),
                Ok(None) => debug!(index = i, "No posted limit"),
                Err(e) => warn!(index = i, error = %e, "Speed limit lookup skipped"),
            }
        }
        Ok(series)
    }
}
