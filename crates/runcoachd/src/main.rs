//! Runcoach Daemon - run results ingestion and coaching service
//!
//! Stores submitted game runs and answers each one with a short coaching
//! comment based on how it compares to every earlier run.

use anyhow::{Context, Result};
use clap::Parser;
use runcoach_common::{AnalysisProvider, FakeAnalysisProvider, HttpAnalysisProvider, ResultsDb};
use runcoachd::config::Config;
use runcoachd::orchestrator::IngestionOrchestrator;
use runcoachd::server::{self, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "runcoachd")]
#[command(about = "Run results ingestion and coaching service", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: $RUNCOACH_CONFIG or /etc/runcoach/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overrides the config file
    #[arg(long)]
    bind: Option<String>,

    /// Answer every submission with canned analysis text instead of calling the provider
    #[arg(long)]
    fake_analysis: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!("[BOOT] Runcoach Daemon v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref());
    if let Some(bind) = cli.bind {
        config.server.bind_addr = bind;
    }

    let db = ResultsDb::open(config.database.location())
        .await
        .context("Failed to open results database")?;
    match db.location().path() {
        Some(path) => info!("[BOOT] Result store ready at {}", path.display()),
        None => info!("[BOOT] Result store ready (in-memory, not persisted)"),
    }

    let provider: Arc<dyn AnalysisProvider> = if cli.fake_analysis {
        warn!("[BOOT] Using fake analysis provider");
        Arc::new(FakeAnalysisProvider::always(
            "Analysis is disabled on this server. Keep practicing!",
        ))
    } else {
        if config.analysis.api_key.is_none() {
            warn!("[BOOT] No analysis API key configured; provider calls may be rejected");
        }
        let provider = HttpAnalysisProvider::new(config.analysis.clone())
            .context("Failed to create analysis provider")?;
        info!("[BOOT] Analysis model: {}", provider.model());
        Arc::new(provider)
    };

    let orchestrator = IngestionOrchestrator::new(Arc::new(db), provider);

    server::run(AppState::new(orchestrator), &config.server).await
}
