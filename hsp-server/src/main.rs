//! `hsp-server`: the single binary fronting the HSP pipeline (spec §1, §6).
//! Subcommands fold every operation the teacher split across standalone
//! scripts into one entrypoint, the way `openldbsvws`'s CLI folds its SOAP
//! operations behind one `Command`.

mod cache;
mod circuit_breaker;
mod decoder;
mod error;
mod fingerprint;
mod metrics;
mod middleware;
mod rate_limiter;
mod recommendations;
mod routes;
mod state;
mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hsp_core::client::{HspClient, HspClientConfig};
use hsp_core::{EnvConfig, FareIngester, Normalizer, ProgressStore, Store};

use crate::decoder::NullFaresDecoder;
use crate::state::AppState;

/// Time between scheduled background aggregation passes while `serve` runs
/// (spec §4.4): the binary stays fresh without relying on an external cron.
const AGGREGATION_INTERVAL: std::time::Duration = std::time::Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "hsp-server", about = "HSP ingestion, aggregation, and delay-prediction service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the HTTP prediction/fare API (C6) plus a background aggregator.
    Serve {
        /// Overrides `HSP_PORT`/the env config's port.
        #[arg(long)]
        port: Option<u16>,
        /// Shared secret required in `X-Admin-Token` on `/api/reset-rate-limit`.
        #[arg(long, env = "HSP_ADMIN_TOKEN")]
        admin_token: Option<String>,
    },
    /// Runs one ingestion phase (C2/C1/C3) to completion from a phase document.
    Ingest {
        /// Path to a JSON `PhaseConfig` document (spec §6).
        #[arg(long)]
        phase: std::path::PathBuf,
    },
    /// Runs one statistics aggregation pass (C4) over the current store.
    Aggregate,
    /// Syncs the fares archive (C1 + fare ingester) if it has gone stale.
    FaresSync,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let env = EnvConfig::from_env().context("loading environment configuration")?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| env.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(30)
        .min_connections(20)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .max_lifetime(std::time::Duration::from_secs(60 * 60))
        .connect(&env.database_url)
        .await
        .context("connecting to the database")?;
    let store = Store::new(pool);

    match cli.command {
        Commands::Serve { port, admin_token } => serve(store, env, port, admin_token).await,
        Commands::Ingest { phase } => ingest(store, env, phase).await,
        Commands::Aggregate => aggregate(store).await,
        Commands::FaresSync => fares_sync(store, env).await,
    }
}

async fn serve(store: Store, env: EnvConfig, port_override: Option<u16>, admin_token: Option<String>) -> Result<()> {
    let state = AppState::new(store.clone(), admin_token);

    let aggregator_store = store.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(AGGREGATION_INTERVAL);
        loop {
            ticker.tick().await;
            match hsp_core::aggregator::recompute(&aggregator_store).await {
                Ok(report) => tracing::info!(
                    routes_recomputed = report.routes_recomputed,
                    routes_failed = report.routes_failed,
                    operators_recomputed = report.operators_recomputed,
                    operators_failed = report.operators_failed,
                    "scheduled aggregation pass complete"
                ),
                Err(error) => tracing::error!(%error, "scheduled aggregation pass failed"),
            }
        }
    });

    let sweeper_state = state.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60 * 60));
        loop {
            ticker.tick().await;
            sweeper_state.rate_limiter.sweep();
            sweeper_state.prediction_cache.sweep_expired();
            sweeper_state.fare_cache.sweep_expired();
        }
    });

    let app = routes::build_router(state);

    let port = port_override.unwrap_or(env.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await.context("binding the HTTP listener")?;
    tracing::info!(%addr, "hsp-server listening");
    axum::serve(listener, app).await.context("HTTP server exited")?;
    Ok(())
}

/// SIGTERM/SIGINT to the ingestion process must finish the in-flight HTTP
/// call, commit to the store, persist progress, and exit within 30s
/// (spec §5); past that, force-exit rather than hang forever.
const SHUTDOWN_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(30);

async fn ingest(store: Store, env: EnvConfig, phase_path: std::path::PathBuf) -> Result<()> {
    let phase_raw = tokio::fs::read_to_string(&phase_path).await.context("reading phase document")?;
    let phase: hsp_core::config::PhaseConfig = serde_json::from_str(&phase_raw).context("parsing phase document")?;

    let client = Arc::new(HspClient::new(HspClientConfig {
        base_url: "https://hsp-prod.rockshore.net/api/v1".to_string(),
        fares_base_url: "https://hsp-prod.rockshore.net/api/v1".to_string(),
        username: env.hsp_username.clone(),
        password: env.hsp_password.clone(),
        retry: phase.retry,
    }));
    let normalizer = Arc::new(Normalizer::new(store.clone()));
    let progress_dir = std::env::var("HSP_PROGRESS_DIR").unwrap_or_else(|_| ".".to_string());
    let progress_store = Arc::new(ProgressStore::new(progress_dir));

    let cancel = CancellationToken::new();
    let run = tokio::spawn({
        let phase = phase.clone();
        let cancel = cancel.clone();
        async move { hsp_core::scheduler::run_phase(&phase, client, normalizer, progress_store, cancel).await }
    });

    tokio::pin!(run);
    let report = tokio::select! {
        result = &mut run => result.context("ingestion phase task panicked")?.context("running ingestion phase")?,
        _ = wait_for_shutdown_signal() => {
            tracing::info!("shutdown signal received, finishing in-flight task and persisting progress");
            cancel.cancel();
            match tokio::time::timeout(SHUTDOWN_GRACE_PERIOD, run).await {
                Ok(result) => result.context("ingestion phase task panicked")?.context("running ingestion phase")?,
                Err(_) => {
                    tracing::error!("ingestion phase did not shut down within the grace period, forcing exit");
                    std::process::exit(1);
                }
            }
        }
    };

    tracing::info!(
        phase = phase.phase_name,
        tasks_completed = report.tasks_completed,
        tasks_skipped = report.tasks_skipped,
        tasks_failed = report.tasks_failed,
        records_written = report.records_written,
        "ingestion phase complete"
    );
    Ok(())
}

/// Resolves on either SIGINT or (on Unix) SIGTERM.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn aggregate(store: Store) -> Result<()> {
    let report = hsp_core::aggregator::recompute(&store).await.context("running aggregation pass")?;
    tracing::info!(
        routes_recomputed = report.routes_recomputed,
        routes_failed = report.routes_failed,
        operators_recomputed = report.operators_recomputed,
        operators_failed = report.operators_failed,
        "aggregation pass complete"
    );
    Ok(())
}

async fn fares_sync(store: Store, env: EnvConfig) -> Result<()> {
    let client = Arc::new(HspClient::new(HspClientConfig {
        base_url: "https://hsp-prod.rockshore.net/api/v1".to_string(),
        fares_base_url: "https://hsp-prod.rockshore.net/api/v1".to_string(),
        username: env.hsp_username,
        password: env.hsp_password,
        retry: hsp_core::config::RetryConfig::default(),
    }));
    let ingester = FareIngester::new(client, store, Arc::new(NullFaresDecoder));
    let report = ingester.sync(None).await.context("syncing fares archive")?;
    tracing::info!(
        refreshed = report.refreshed,
        fares_written = report.fares_written,
        dropped_inadmissible = report.dropped_inadmissible,
        dropped_data_source_conflict = report.dropped_data_source_conflict,
        "fares sync complete"
    );
    Ok(())
}
