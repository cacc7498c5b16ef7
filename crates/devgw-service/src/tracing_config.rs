//! Logging setup.
//!
//! Console output for development and JSON structured logging for
//! production, filtered by level.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::LoggingConfig;

/// Tracing output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable console output (for development).
    Console,
    /// JSON structured logging (for production).
    Json,
}

impl TracingFormat {
    fn parse(name: &str) -> Self {
        match name {
            "json" => TracingFormat::Json,
            _ => TracingFormat::Console,
        }
    }
}

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "debug", "devgw_hal=trace").
    pub log_level: String,
    /// Output format (console or JSON).
    pub format: TracingFormat,
    /// Service name attached to the startup event.
    pub service_name: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: TracingFormat::Console,
            service_name: "devgw".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn new(log_level: String, format: TracingFormat, service_name: String) -> Self {
        Self {
            log_level,
            format,
            service_name,
        }
    }

    /// Create config from the `logging` section of the service config.
    pub fn from_logging(logging: &LoggingConfig) -> Self {
        Self {
            log_level: logging.level.clone(),
            format: TracingFormat::parse(&logging.format),
            ..Self::default()
        }
    }

    /// Create config from environment variables.
    ///
    /// Environment variables:
    /// - `DEVGW_LOG_LEVEL`, then `RUST_LOG`: Log level (default: "info")
    /// - `DEVGW_LOG_FORMAT`: "console" or "json" (default: "console")
    pub fn from_env() -> Self {
        let log_level = std::env::var("DEVGW_LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());

        let format = std::env::var("DEVGW_LOG_FORMAT")
            .map_or(TracingFormat::Console, |f| TracingFormat::parse(&f));

        Self {
            log_level,
            format,
            ..Self::default()
        }
    }
}

/// Initialize the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_tracing(config: TracingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = match config.format {
        TracingFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .pretty()
            .boxed(),
        TracingFormat::Json => fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(service = %config.service_name, "Tracing initialized");
    Ok(())
}

/// Initialize tracing with default configuration from environment.
pub fn init_default_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(TracingConfig::from_env())
}
