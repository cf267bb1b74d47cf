//! CLI entry point for the drive rater.
//!
//! Provides subcommands for pulling trips from the trip store, detecting
//! maneuvers in trace files, and scoring agents against a population.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use drive_rater::aggregate::{TripAggregator, group_by_agent, lookup_speed_limits};
use drive_rater::config::{Config, ServiceConfig};
use drive_rater::fetch::BasicClient;
use drive_rater::fetch::auth::{ApiKey, UrlParam};
use drive_rater::infra::roads::HttpSpeedLimits;
use drive_rater::infra::tripstore::HttpTripStore;
use drive_rater::output::{
    append_record, log_report, log_turning_summary, print_json, print_pretty, write_json,
    write_summary, write_trip_file,
};
use drive_rater::parser::{load_trip_file, load_trip_index, traces_from_samples};
use drive_rater::preprocess::organize_trips;
use drive_rater::scoring::{
    PopulationBaseline, load_population, score_agent, score_all, screen_population,
};
use drive_rater::services::speed_limit::{NoSpeedLimits, SpeedLimitService};
use drive_rater::services::trip_store::{TripScope, collect_trips};
use drive_rater::stats::{AgentStats, TurningSpeedSummary};
use drive_rater::trace::CleanTripSet;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "drive_rater")]
#[command(about = "Detect driving maneuvers in GPS traces and score drivers", long_about = None)]
struct Cli {
    /// JSON config file overriding thresholds, weights and endpoints
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct ScopeArgs {
    /// Every organization at this hierarchy level
    #[arg(long)]
    hierarchy: Option<i64>,

    /// A single organization
    #[arg(long)]
    org: Option<String>,

    /// A single agent
    #[arg(long)]
    agent: Option<String>,
}

impl ScopeArgs {
    fn into_scope(self) -> Result<TripScope> {
        match (self.hierarchy, self.org, self.agent) {
            (Some(h), _, _) => Ok(TripScope::Hierarchy(h)),
            (_, Some(org), _) => Ok(TripScope::Org(org)),
            (_, _, Some(agent)) => Ok(TripScope::Agent(agent)),
            _ => anyhow::bail!("one of --hierarchy, --org or --agent is required"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download completed trips from the trip store into a trace file
    Query {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Trace file to write (gzip compressed if it ends in .gz)
        #[arg(short, long, default_value = "trips.json")]
        output: String,

        /// Optional: write the agent -> trips index as JSON
        #[arg(long)]
        trip_index: Option<String>,
    },
    /// Detect maneuvers in a trace file and summarize them per agent
    Detect {
        /// Trace file (JSON, optionally gzip compressed)
        #[arg(value_name = "FILE")]
        source: String,

        /// Agent id for the row; defaults to the file name
        #[arg(long, conflicts_with = "trip_index")]
        agent_id: Option<String>,

        /// Agent -> trips index; produces one row per agent
        #[arg(long)]
        trip_index: Option<String>,

        /// Population CSV to append rows to
        #[arg(short, long)]
        population: Option<String>,

        /// Optional: write turning-speed statistics as CSV
        #[arg(long)]
        summary: Option<String>,
    },
    /// Compute per-maneuver population statistics
    Baseline {
        /// Population CSV
        population: String,

        /// Optional: write the baseline as JSON
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Score one agent of a population file
    Score {
        /// Population CSV
        population: String,

        agent_id: String,
    },
    /// Score every agent of a population file against that population
    ScoreAll {
        /// Population CSV
        population: String,

        /// CSV file to append scores to
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Keep only population rows with enough drive time
    Screen {
        input: String,
        output: String,

        /// Seconds; defaults to the scoring minimum
        #[arg(long)]
        min_drive_time: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_logging()?;

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Query {
            scope,
            output,
            trip_index,
        } => {
            let token =
                std::env::var("TRIP_STORE_TOKEN").context("TRIP_STORE_TOKEN must be set")?;
            let client = ApiKey::bearer(http_client()?, &token)?;
            let store = HttpTripStore::new(&config.services.trip_store_url, client);

            let query = collect_trips(&store, &scope.into_scope()?).await?;
            let trips = traces_from_samples(query.samples)?;
            write_trip_file(&output, &trips)?;
            if let Some(path) = trip_index {
                write_json(&path, &query.trips_by_agent)?;
                info!(path = %path, agents = query.trips_by_agent.len(), "Trip index written");
            }
        }
        Commands::Detect {
            source,
            agent_id,
            trip_index,
            population,
            summary,
        } => {
            detect(
                &config,
                &source,
                agent_id,
                trip_index.as_deref(),
                population.as_deref(),
                summary.as_deref(),
            )
            .await?;
        }
        Commands::Baseline { population, output } => {
            let rows = load_population(&population)?;
            let baseline = PopulationBaseline::from_population(&rows)?;
            print_json(&baseline)?;
            if let Some(path) = output {
                write_json(&path, &baseline)?;
            }
        }
        Commands::Score {
            population,
            agent_id,
        } => {
            let rows = load_population(&population)?;
            let (stats, report) = score_agent(&agent_id, &rows, &config.scoring)?;
            log_report(&report, &stats);
        }
        Commands::ScoreAll { population, output } => {
            let rows = load_population(&population)?;
            let scores = score_all(&rows, &config.scoring.weights)?;
            for score in &scores {
                info!(
                    agent_id = %score.agent_id,
                    composite = format!("{:.2}", score.composite),
                    "Score"
                );
                if let Some(path) = &output {
                    append_record(path, score)?;
                }
            }
        }
        Commands::Screen {
            input,
            output,
            min_drive_time,
        } => {
            let minimum = min_drive_time.unwrap_or(config.scoring.min_drive_time);
            screen_population(&input, &output, minimum)?;
        }
    }

    Ok(())
}

/// Colored stderr plus a JSON daily-rolling log file.
fn init_logging() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/drive_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("drive_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

fn http_client() -> Result<BasicClient> {
    BasicClient::with_timeouts(Duration::from_secs(30), Duration::from_secs(10))
}

/// Roads API when `SPEED_LIMIT_API_KEY` is set, otherwise no limits.
fn speed_limit_service(services: &ServiceConfig) -> Result<Arc<dyn SpeedLimitService>> {
    match std::env::var("SPEED_LIMIT_API_KEY") {
        Ok(key) if !key.is_empty() => {
            let client = UrlParam::new(http_client()?, "key", key);
            Ok(Arc::new(HttpSpeedLimits::new(
                &services.speed_limit_url,
                client,
                services.lookup_policy(),
            )))
        }
        _ => {
            warn!("SPEED_LIMIT_API_KEY not set, speeding detection disabled");
            Ok(Arc::new(NoSpeedLimits))
        }
    }
}

/// Cleans a trace file, runs the detectors per agent and emits one
/// [`AgentStats`] row per agent.
#[tracing::instrument(skip(config, population, summary))]
async fn detect(
    config: &Config,
    source: &str,
    agent_id: Option<String>,
    trip_index: Option<&str>,
    population: Option<&str>,
    summary: Option<&str>,
) -> Result<()> {
    let trips = load_trip_file(source)?;
    let clean = organize_trips(trips, &config.preprocess);

    let groups: Vec<(String, CleanTripSet)> = match trip_index {
        Some(path) => group_by_agent(&clean, load_trip_index(path)?),
        None => {
            let agent = agent_id.unwrap_or_else(|| default_agent_id(source));
            vec![(agent, clean)]
        }
    };

    let service = speed_limit_service(&config.services)?;
    let aggregator = TripAggregator::new(&config.detection);
    let mut turning_speeds = Vec::new();

    for (agent_id, trips) in groups {
        let span = tracing::info_span!("rate_agent", agent_id = %agent_id, trips = trips.len());
        async {
            let limits =
                lookup_speed_limits(service.clone(), &trips, config.services.concurrency).await;
            let totals = aggregator.aggregate(&trips, &limits);
            let stats = AgentStats::from_totals(&agent_id, &totals);

            print_json(&stats)?;
            if let Some(path) = population {
                append_record(path, &stats)?;
            }
            turning_speeds.extend(totals.turning_speeds);
            Ok::<_, anyhow::Error>(())
        }
        .instrument(span)
        .await?;
    }

    let stats = TurningSpeedSummary::from_speeds(&turning_speeds);
    log_turning_summary(&stats);
    print_pretty(&stats);
    if let Some(path) = summary {
        write_summary(path, &stats)?;
    }
    Ok(())
}

/// `trips/525470.json.gz` -> `525470`
fn default_agent_id(source: &str) -> String {
    Path::new(source)
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or(source)
        .to_string()
}
