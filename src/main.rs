//! Latency monitor
//!
//! Serves the dashboard API and drives the synthetic latency updater.

use anyhow::Context;
use clap::{Parser, Subcommand};
use latency_monitor::{
    api::{self, AppState},
    client::RadarClient,
    config::Config,
    simulator::{retention_cutoff, seed_connections, LatencyUpdater, UniformLatency, UpdaterStatus},
    storage::Database,
    types::ReferenceData,
};
use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "latency-monitor")]
#[command(about = "Exchange to cloud-region latency monitor backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API and the latency updater
    Serve {
        /// Do not start the latency updater
        #[arg(long)]
        no_updater: bool,
    },
    /// Import exchanges, cloud regions and locations from a JSON file
    Import {
        /// Path to the reference data file
        file: String,
    },
    /// Generate random exchange/region connections
    Seed {
        /// Number of pairs to draw
        #[arg(short, long, default_value = "20")]
        count: usize,
        /// RNG seed for reproducible pairs
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run a single latency update pass
    Tick,
    /// Delete samples older than the given age
    Prune {
        /// Age in hours; defaults to the configured retention
        #[arg(long)]
        hours: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Serve { no_updater } => serve(config, no_updater).await,
        Commands::Import { file } => import(config, &file).await,
        Commands::Seed { count, seed: rng_seed } => seed(config, count, rng_seed).await,
        Commands::Tick => tick(config).await,
        Commands::Prune { hours } => prune(config, hours).await,
    }
}

async fn open_db(config: &Config) -> anyhow::Result<Database> {
    Database::connect_with(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", config.database.url))
}

async fn serve(config: Config, no_updater: bool) -> anyhow::Result<()> {
    tracing::info!("Starting latency monitor");

    let db = open_db(&config).await?;
    let radar = Arc::new(RadarClient::new(&config.radar)?);
    if config.radar.api_token.is_empty() {
        tracing::warn!("Radar API token not configured, /api/latency/latencylive will fail");
    }

    let updater = if config.updater.enabled && !no_updater {
        let source = UniformLatency::new(config.updater.latency_ceiling());
        Some(LatencyUpdater::new(db.clone(), source, &config.updater).spawn())
    } else {
        tracing::warn!("Latency updater disabled");
        None
    };
    let status = updater
        .as_ref()
        .map(|h| h.status())
        .unwrap_or_else(|| Arc::new(RwLock::new(UpdaterStatus::default())));

    let state = AppState::new(db.clone(), radar, status);
    let listener = tokio::net::TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr()))?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown requested");
    };
    api::serve(listener, state, &config.server.client_url, shutdown).await?;

    if let Some(handle) = updater {
        handle.stop().await;
    }
    db.close().await;

    tracing::info!("Latency monitor stopped");
    Ok(())
}

async fn import(config: Config, file: &str) -> anyhow::Result<()> {
    let data = ReferenceData::from_file(file)
        .await
        .with_context(|| format!("failed to load reference data from {}", file))?;

    let db = open_db(&config).await?;
    let summary = db.import_reference(&data).await?;

    println!(
        "Imported {} exchanges, {} cloud regions, {} server locations",
        summary.exchanges, summary.providers, summary.locations
    );
    Ok(())
}

async fn seed(config: Config, count: usize, seed: Option<u64>) -> anyhow::Result<()> {
    let db = open_db(&config).await?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    let written = seed_connections(&db, count, &mut rng).await?;
    println!("Seeded {} connections ({} total)", written, db.count_connections().await?);
    Ok(())
}

async fn tick(config: Config) -> anyhow::Result<()> {
    let db = open_db(&config).await?;
    let source = UniformLatency::new(config.updater.latency_ceiling());
    let mut updater = LatencyUpdater::new(db, source, &config.updater);

    let report = updater.tick().await?;
    println!(
        "Updated {} connections ({} failed, {} samples pruned)",
        report.updated, report.failed, report.pruned
    );
    Ok(())
}

async fn prune(config: Config, hours: Option<u32>) -> anyhow::Result<()> {
    let window = match hours {
        Some(h) => chrono::Duration::hours(i64::from(h)),
        None => match config.updater.retention() {
            Some(w) => w,
            None => {
                println!("Retention disabled; nothing to prune");
                return Ok(());
            }
        },
    };

    let cutoff = retention_cutoff(chrono::Utc::now(), window)
        .with_context(|| format!("{}h reaches past the supported date range", window.num_hours()))?;

    let db = open_db(&config).await?;
    let pruned = db.prune_samples_before(cutoff).await?;
    println!("Pruned {} samples older than {}h", pruned, window.num_hours());
    Ok(())
}
