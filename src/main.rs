use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use tokio::sync::watch;
use tracing::info;

use deal_watcher::config::MetricsConfig;
use deal_watcher::{logging, App, AppConfig};

#[derive(Debug, Parser)]
#[command(name = "deal-watcher", version, about = "Watch retailer prices and alert on real discounts")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Print alerts to the console and keep the price cache in memory
    #[arg(long)]
    dry_run: bool,
}

fn init_metrics(config: &MetricsConfig) {
    let addr = ([0, 0, 0, 0], config.port);
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => info!(port = config.port, "Metrics exporter listening"),
        Err(e) => tracing::warn!(error = %e, "Failed to install Prometheus recorder"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let _log_guard = logging::init_tracing(&config.logging)?;
    info!(dry_run = cli.dry_run, "Starting Deal Watcher...");

    if config.metrics.enabled {
        init_metrics(&config.metrics);
    }

    let app = App::build(config, cli.dry_run).await?;

    if cli.once {
        let report = app.runner().run_cycle().await;
        app.shutdown().await?;
        let report = report?;
        info!(
            observations = report.observations,
            failures = report.failures,
            alert_sent = report.alert_sent,
            "Single cycle complete"
        );
        return Ok(());
    }

    info!(
        interval_secs = app.config().general.interval_secs,
        database = %app.config().general.database,
        "Watching prices"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    app.scheduler().run(shutdown_rx).await;
    app.shutdown().await?;

    Ok(())
}
