use etvr::cli::Cli;
use etvr::error::EtvrError;
use etvr::logger::initialize as LoggerInitialize;

use tracker_core::Etvr;
use tracker_core::http::router;
use tracker_core::tracker::NoopTracker;

use common::ErrorLocation;

use std::fs::create_dir_all;
use std::panic::Location;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), EtvrError> {
    let cli = Cli::parse();

    create_dir_all(&cli.log_dir).map_err(|e| EtvrError::Etvr {
        message: format!("Failed to create log directory: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    // Logger first, everything below logs
    LoggerInitialize(&cli.log_dir)?;

    info!("ETVR backend starting");
    info!("Config file: {}", cli.config.display());
    info!("Log directory: {}", cli.log_dir.display());

    let etvr = Arc::new(Etvr::new(&cli.config, Arc::new(NoopTracker)).await?);

    // Worker failures are not fatal, the control surface can retry via /etvr/start
    if let Err(e) = etvr.start().await {
        error!("Failed to start OSC workers: {e}");
    }

    let addr = cli.http_addr();
    let listener = TcpListener::bind(addr).await.map_err(|e| EtvrError::Http {
        message: format!("Failed to bind {addr}: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    info!("HTTP control surface listening on http://{addr}");

    let served = axum::serve(listener, router(Arc::clone(&etvr)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    let status = etvr.stop().await;
    info!("ETVR backend stopped: {status:?}");

    served.map_err(|e| EtvrError::Http {
        message: format!("HTTP server failed: {e}"),
        location: ErrorLocation::from(Location::caller()),
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => error!("Failed to listen for shutdown signal: {e}"),
    }
}
