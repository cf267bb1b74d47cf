//! Trait and types for the read-only trip store (organizations, agents,
//! completed trips and their location samples).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// One recorded location fix as returned by the trip store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub timestamp_ms: i64,
    pub lat: f64,
    pub lon: f64,
    /// m/s
    pub speed: Option<f64>,
    /// Degrees.
    pub heading: Option<f64>,
}

/// Abstraction over the remote trip-tracking store.
#[async_trait::async_trait]
pub trait TripStore: Send + Sync {
    /// Organizations at the given hierarchy level.
    async fn org_ids(&self, hierarchy: i64) -> Result<Vec<String>>;

    /// Active agents belonging to an organization.
    async fn agent_ids(&self, org_id: &str) -> Result<Vec<String>>;

    /// Completed trips, grouped by agent. Agents without trips are absent.
    async fn trip_ids(&self, agent_ids: &[String]) -> Result<HashMap<String, Vec<String>>>;

    /// Location samples per trip, in recording order.
    async fn location_samples(
        &self,
        trip_ids: &[String],
    ) -> Result<HashMap<String, Vec<LocationSample>>>;
}

/// Which agents a query covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripScope {
    /// Every organization at a hierarchy level (a company).
    Hierarchy(i64),
    /// One organization (a shop).
    Org(String),
    Agent(String),
}

/// Completed trips of every agent in scope, with their location samples.
#[derive(Debug, Default)]
pub struct TripQuery {
    /// Agent id to trip ids.
    pub trips_by_agent: BTreeMap<String, Vec<String>>,
    pub samples: HashMap<String, Vec<LocationSample>>,
}

/// Walks organizations, agents and completed trips down to location samples.
#[tracing::instrument(skip(store))]
pub async fn collect_trips(store: &dyn TripStore, scope: &TripScope) -> Result<TripQuery> {
    let agent_ids = match scope {
        TripScope::Hierarchy(hierarchy) => {
            let mut agents = Vec::new();
            for org_id in store.org_ids(*hierarchy).await? {
                agents.extend(store.agent_ids(&org_id).await?);
            }
            agents
        }
        TripScope::Org(org_id) => store.agent_ids(org_id).await?,
        TripScope::Agent(agent_id) => vec![agent_id.clone()],
    };
    info!(agents = agent_ids.len(), "Agents in scope");

    let trips_by_agent: BTreeMap<String, Vec<String>> =
        store.trip_ids(&agent_ids).await?.into_iter().collect();
    if trips_by_agent.is_empty() {
        warn!("No completed trips in scope");
        return Ok(TripQuery::default());
    }

    let trip_ids: Vec<String> = trips_by_agent.values().flatten().cloned().collect();
    let samples = store.location_samples(&trip_ids).await?;
    info!(trips = trip_ids.len(), with_locations = samples.len(), "Trips collected");

    Ok(TripQuery {
        trips_by_agent,
        samples,
    })
}
