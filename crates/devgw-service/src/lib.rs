//! devgw Gateway Service
//!
//! The execution router and its HTTP surface: a client submits an OpenQASM 3
//! program over virtual qubits `$0..$N-1`, the router compiles it against
//! the device topology for the configured backend, runs it and returns
//! counts keyed by classical-bit bitstrings.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     devgw-server (axum)                      │
//! │                                                              │
//! │  rest_router ──► ExecutionRouter<GatewayBackend>             │
//! │                    ├─ DeviceLifecycle (topology, calibration)│
//! │                    ├─ StatusSource (status file)             │
//! │                    └─ GatewayBackend: simulator|pulse|process│
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use devgw_service::{ExecutionRouter, ServiceConfig, rest_router};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::load(Some(std::path::Path::new("config/config.yaml")))?;
//!     let router = Arc::new(ExecutionRouter::from_config(&config)?);
//!     let app = rest_router(router, &config.server.cors_origins);
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_address()?).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod rest;
pub mod router;
pub mod tracing_config;

pub use backend::{GatewayBackend, GatewayProgram, gateway_registry};
pub use config::{ConfigError, ServiceConfig};
pub use error::{ServiceError, ServiceResult};
pub use rest::rest_router;
pub use router::{
    DeviceInfo, ExecutionRouter, INACTIVE_MESSAGE, INTERNAL_ERROR_MESSAGE, RouterSettings, StatusSource,
};
pub use tracing_config::{TracingConfig, TracingFormat, init_default_tracing, init_tracing};
