//! devgw gateway server.
//!
//! # Usage
//!
//! ```bash
//! devgw-server --config config/config.yaml
//! DEVGW_PLUGIN=pulse devgw-server --address 127.0.0.1:8080 --log-format json
//! ```
//!
//! Environment overrides (`DEVGW_ADDRESS`, `DEVGW_PLUGIN`, ...) are read
//! after the file; command-line flags win over both.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::Notify;
use tracing::{error, info};

use devgw_service::{ExecutionRouter, ServiceConfig, TracingConfig, init_tracing, rest_router};

#[derive(Debug, Parser)]
#[command(name = "devgw-server", version, about = "Quantum device gateway")]
struct Cli {
    /// Configuration file
    #[arg(long, env = "DEVGW_CONFIG", default_value = "config/config.yaml")]
    config: PathBuf,

    /// Listen address, overriding the configuration
    #[arg(long)]
    address: Option<String>,

    /// Log format, overriding the configuration
    #[arg(long, value_parser = ["console", "json"])]
    log_format: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ServiceConfig::load(Some(cli.config.as_path()))
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(address) = cli.address {
        config.server.address = address;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.validate()?;

    init_tracing(TracingConfig::from_logging(&config.logging)).map_err(|e| anyhow::anyhow!(e))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.max_workers)
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    info!(plugin = %config.plugin.name, "Starting devgw gateway");

    let router = Arc::new(ExecutionRouter::from_config(&config)?);
    let app = rest_router(router, &config.server.cors_origins);

    let shutdown = Arc::new(Notify::new());
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_clone.notify_one();
    });

    let addr = config.socket_address()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.notified().await;
            info!("Shutdown signal received");
        })
        .await?;

    info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}
