use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::fetch::{HttpClient, fetch_json};
use crate::services::trip_store::{LocationSample, TripStore};

/// Record ids arrive as JSON strings or integers depending on the collection.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(i64),
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        match id {
            RecordId::Text(s) => s,
            RecordId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct OrgEntry {
    org_id: RecordId,
}

#[derive(Deserialize)]
struct Entry {
    id: RecordId,
}

/// `[timestamp_ms, lat, lon, speed, heading]`
#[derive(Deserialize)]
struct LocationPoint(i64, f64, f64, Option<f64>, Option<f64>);

impl From<LocationPoint> for LocationSample {
    fn from(LocationPoint(timestamp_ms, lat, lon, speed, heading): LocationPoint) -> Self {
        LocationSample {
            timestamp_ms,
            lat,
            lon,
            speed,
            heading,
        }
    }
}

#[derive(Deserialize)]
struct TripLocations {
    /// Absent when the trip never shared its location.
    location: Option<Vec<LocationPoint>>,
}

/// REST client for the trip store.
///
/// Authentication is whatever the wrapped [`HttpClient`] adds, normally
/// [`crate::fetch::auth::ApiKey::bearer`].
pub struct HttpTripStore<C> {
    client: C,
    base_url: String,
}

impl<C: HttpClient> HttpTripStore<C> {
    pub fn new(base_url: &str, client: C) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Appends `segments` to the base URL; each one is percent-encoded, so an
    /// id containing `/`, `?` or `#` stays a single path segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("{} cannot be a base URL", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

/// Keeps the first occurrence of every org id.
fn unique_org_ids(entries: Vec<OrgEntry>) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for entry in entries {
        let id = String::from(entry.org_id);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[async_trait]
impl<C: HttpClient> TripStore for HttpTripStore<C> {
    async fn org_ids(&self, hierarchy: i64) -> Result<Vec<String>> {
        let mut url = self.url(&["v1", "orgs"])?;
        url.query_pairs_mut()
            .append_pair("hierarchy", &hierarchy.to_string());
        let entries: Vec<OrgEntry> = fetch_json(&self.client, url.as_str()).await?;
        let ids = unique_org_ids(entries);
        info!(hierarchy, orgs = ids.len(), "Organizations queried");
        Ok(ids)
    }

    async fn agent_ids(&self, org_id: &str) -> Result<Vec<String>> {
        let url = self.url(&["v1", "orgs", org_id, "agents"])?;
        let entries: Vec<Entry> = fetch_json(&self.client, url.as_str()).await?;
        let ids: Vec<String> = entries.into_iter().map(|e| e.id.into()).collect();
        debug!(org_id, agents = ids.len(), "Agents queried");
        Ok(ids)
    }

    async fn trip_ids(&self, agent_ids: &[String]) -> Result<HashMap<String, Vec<String>>> {
        let mut trips = HashMap::new();
        for agent_id in agent_ids {
            let mut url = self.url(&["v1", "agents", agent_id.as_str(), "trips"])?;
            url.query_pairs_mut().append_pair("completed", "true");
            let entries: Vec<Entry> = fetch_json(&self.client, url.as_str()).await?;
            if entries.is_empty() {
                continue;
            }
            trips.insert(
                agent_id.clone(),
                entries.into_iter().map(|e| e.id.into()).collect(),
            );
        }
        info!(agents = trips.len(), "Completed trips queried");
        Ok(trips)
    }

    async fn location_samples(
        &self,
        trip_ids: &[String],
    ) -> Result<HashMap<String, Vec<LocationSample>>> {
        let mut samples = HashMap::new();
        for trip_id in trip_ids {
            let url = self.url(&["v1", "trips", trip_id.as_str(), "locations"])?;
            let body: TripLocations = fetch_json(&self.client, url.as_str()).await?;
            let Some(points) = body.location else {
                debug!(trip_id = %trip_id, "Trip has no shared location");
                continue;
            };
            samples.insert(
                trip_id.clone(),
                points.into_iter().map(LocationSample::from).collect(),
            );
        }
        info!(trips = samples.len(), "Location samples queried");
        Ok(samples)
    }
}
