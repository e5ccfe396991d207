// RiskWatch Exporter - HTTP ingestion and Prometheus exporter
// Copyright (c) 2025 David Martin Venti
//
// Licensed under AGPL-3.0.
// See LICENSE file for details.

//! # RiskWatch Exporter
//!
//! Receives record batches over HTTP, runs rolling-window drift monitoring
//! and exposes the resulting metrics to Prometheus.
//!
//! ## Usage
//!
//! ```bash
//! # Run with a config file
//! riskwatch-exporter --config config/riskwatch.toml
//!
//! # Run on a custom port with synthetic traffic
//! riskwatch-exporter --config config/riskwatch.toml --port 9090 \
//!     --simulate maternal-health-risk
//! ```

mod app;
mod config;
mod reference;
mod simulate;

use app::AppState;
use clap::Parser;
use config::ExporterConfig;
use riskwatch::{MonitoringService, SummaryEngine};
use simulate::Simulator;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// RiskWatch drift-monitoring exporter
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "RISKWATCH_CONFIG", default_value = "config/riskwatch.toml")]
    config: String,

    /// Port to listen on
    #[arg(short, long, env = "RISKWATCH_PORT", default_value = "8085")]
    port: u16,

    /// Feed synthetic records into this dataset
    #[arg(long)]
    simulate: Option<String>,

    /// Interval between synthetic records in milliseconds
    #[arg(long, default_value = "200")]
    simulate_interval_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("RiskWatch Exporter v{}", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = ExporterConfig::from_file(&args.config)?;
    let registrations = config.registrations()?;
    let service = MonitoringService::initialize(
        config.options().clone(),
        registrations,
        Arc::new(SummaryEngine::new()),
    )?;

    info!(
        "Monitoring {} dataset(s): window_size={}, calculation_period={}s",
        service.dataset_names().len(),
        config.options().window_size,
        config.options().calculation_period_sec
    );

    if let Some(dataset) = args.simulate {
        if !service.is_registered(&dataset) {
            return Err(format!("cannot simulate unknown dataset '{}'", dataset).into());
        }
        let simulator = Simulator::new(
            Arc::clone(&service),
            dataset,
            Duration::from_millis(args.simulate_interval_ms.max(1)),
        );
        tokio::spawn(simulator.run());
    }

    let app = app::router(AppState::new(service));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("Metrics endpoint: http://{}/metrics", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
