use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use shared_logging::LogLevel;
use shipment_model::{Predictor, TreeEnsembleModel};
use shipment_status::{AppConfig, AppState, ConfigOverrides, PredictionTelemetry};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "shipment-status",
    version,
    about = "Serves the shipment status prediction form"
)]
struct Cli {
    /// TOML config file. Built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, e.g. 127.0.0.1:8501.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Model artifact path.
    #[arg(long)]
    model: Option<PathBuf>,
    /// JSON-lines prediction log.
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// debug, info, warn or error.
    #[arg(long)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    config.apply(ConfigOverrides {
        bind: cli.bind,
        model: cli.model,
        log_file: cli.log_file,
        log_level: cli.log_level,
    });

    tracing_subscriber::registry()
        .with(EnvFilter::new(config.logging.level.as_str()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let model = TreeEnsembleModel::load(&config.model.path)
        .with_context(|| format!("loading model {}", config.model.path.display()))?;
    info!(
        name = %model.metadata().name,
        objective = ?model.objective(),
        trees = model.tree_count(),
        "model loaded"
    );
    let predictor = Predictor::for_shipments(Arc::new(model))
        .context("model does not match the shipment feature schema")?;

    let telemetry = match &config.logging.path {
        Some(path) => PredictionTelemetry::builder("webapp")
            .log_path(path)
            .min_level(config.logging.level)
            .build()
            .with_context(|| format!("opening prediction log {}", path.display()))?,
        None => PredictionTelemetry::disabled(),
    };

    shipment_status::run(config.server.bind, AppState::new(predictor, telemetry)).await
}
