//! HTTP surface of the gateway.
//!
//! | Route | Operation |
//! |-------|-----------|
//! | `POST /v1/jobs` | CallJob |
//! | `GET /v1/status` | GetServiceStatus |
//! | `GET /v1/device` | GetDeviceInfo |
//! | `GET /v1/health` | liveness |
//!
//! CallJob always answers 200; a failed job is a `FAILURE` body.

pub mod types;

use std::sync::{Arc, OnceLock};
use std::time::SystemTime;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use devgw_hal::{Backend, JobId, JobResult};

use crate::error::ServiceError;
use crate::router::{DeviceInfo, ExecutionRouter};

use types::*;

/// Server uptime tracker.
static START_TIME: OnceLock<SystemTime> = OnceLock::new();

fn uptime_seconds() -> u64 {
    START_TIME
        .get()
        .and_then(|start| SystemTime::now().duration_since(*start).ok())
        .map_or(0, |d| d.as_secs())
}

/// Build the axum router over an execution router.
///
/// `cors_origins` is a comma-separated list of allowed origins, or `"*"`.
pub fn rest_router<B>(router: Arc<ExecutionRouter<B>>, cors_origins: &str) -> Router
where
    B: Backend + 'static,
    B::Program: 'static,
{
    START_TIME.get_or_init(SystemTime::now);

    Router::new()
        .route("/v1/health", get(health_handler))
        .route("/v1/jobs", post(call_job_handler::<B>))
        .route("/v1/status", get(service_status_handler::<B>))
        .route("/v1/device", get(device_info_handler::<B>))
        .layer(build_cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(router)
}

fn build_cors_layer(origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    if origins == "*" {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let allowed: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|o| o.trim().parse().ok())
            .collect();
        layer.allow_origin(allowed)
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime_seconds(),
    })
}

async fn call_job_handler<B>(
    State(router): State<Arc<ExecutionRouter<B>>>,
    Json(req): Json<CallJobRequest>,
) -> Json<JobResult>
where
    B: Backend + 'static,
    B::Program: 'static,
{
    let job_id = req.job_id.map_or_else(JobId::generate, JobId::new);
    Json(router.call_job(job_id, &req.program, req.shots).await)
}

async fn service_status_handler<B>(State(router): State<Arc<ExecutionRouter<B>>>) -> Json<ServiceStatusResponse>
where
    B: Backend + 'static,
    B::Program: 'static,
{
    Json(ServiceStatusResponse {
        status: router.get_service_status().await,
    })
}

async fn device_info_handler<B>(
    State(router): State<Arc<ExecutionRouter<B>>>,
) -> Result<Json<DeviceInfo>, ServiceError>
where
    B: Backend + 'static,
    B::Program: 'static,
{
    router.get_device_info().map(Json)
}
