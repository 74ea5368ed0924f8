//! `taskloomd`: the binary that wires configuration, the provider and
//! agent registries, the store, the job pipeline, and the cron scheduler
//! into one running process.

mod config;
mod context;
mod logging;

use clap::{Parser, Subcommand};
use config::DaemonConfig;
use context::AppContext;
use std::time::Duration;

#[derive(Debug, Parser)]
#[command(name = "taskloomd", about = "Multi-tenant agent job execution daemon")]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long, global = true, env = "TASKLOOM_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Runs the pipeline and scheduler until interrupted.
    Serve {
        /// How long to wait for in-flight jobs to finish on shutdown.
        #[arg(long, default_value_t = 30)]
        shutdown_timeout_secs: u64,
    },
    /// Connects to the configured store and runs schema migrations, then exits.
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = DaemonConfig::load(cli.config.as_deref())?;
    logging::init(&config.log_format);

    match cli.command {
        Commands::Serve { shutdown_timeout_secs } => serve(config, Duration::from_secs(shutdown_timeout_secs)).await,
        Commands::Migrate => migrate(config).await,
    }
}

async fn serve(config: DaemonConfig, shutdown_timeout: Duration) -> anyhow::Result<()> {
    let ctx = AppContext::init(config).await?;
    tracing::info!(
        providers = ?ctx.providers.available(),
        agents = ?ctx.agents.names(),
        "starting taskloomd"
    );
    ctx.start();

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining in-flight jobs");
    ctx.stop(shutdown_timeout).await;
    tracing::info!("taskloomd stopped");
    Ok(())
}

async fn migrate(config: DaemonConfig) -> anyhow::Result<()> {
    // Connecting runs the idempotent `CREATE TABLE IF NOT EXISTS` migrations;
    // nothing further is needed once it succeeds.
    taskloom_store::SqlStore::connect(&config.database_url).await?;
    tracing::info!(database_url = %config.database_url, "migrations applied");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
