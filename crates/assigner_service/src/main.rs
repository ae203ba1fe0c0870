use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use ticket_assigner_service::{start_server, AppState, ServiceConfig};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "assigner-service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve ticket assignee predictions over HTTP", long_about = None)]
struct Args {
    /// Path to a TOML configuration file (defaults to ./assigner.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config =
        ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    init_logging(&config.log_level)?;
    info!("Starting Ticket Assigner Service v{}", env!("CARGO_PKG_VERSION"));

    let state = AppState::load(&config).with_context(|| {
        format!("Failed to load model from {}", config.model_path.display())
    })?;

    let metadata = state.metadata();
    info!("Model loaded from {}", config.model_path.display());
    info!("  Trained at: {} (unix)", metadata.trained_at);
    info!("  Available assignees: {}", metadata.labels.join(", "));
    info!("  Model hash: {}", metadata.model_hash);

    start_server(state, &config.bind_addr(), shutdown_signal()).await?;

    info!("Ticket Assigner Service stopped");
    Ok(())
}

fn init_logging(default_level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .context("Failed to initialize logging")
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => warn!("Failed to listen for shutdown signal: {}", err),
    }
}
