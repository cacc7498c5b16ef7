//! JSON request/response types for the HTTP surface.

use serde::{Deserialize, Serialize};

use devgw_hal::DeviceStatus;

// ── Requests ──────────────────────────────────────────────────────────────

/// POST /v1/jobs
#[derive(Debug, Serialize, Deserialize)]
pub struct CallJobRequest {
    /// Client-chosen job id; generated when absent.
    #[serde(default)]
    pub job_id: Option<String>,
    /// OpenQASM 3 program over `$n` qubits.
    pub program: String,
    /// Number of shots.
    #[serde(default = "default_shots")]
    pub shots: u32,
}

fn default_shots() -> u32 {
    1024
}

// ── Responses ─────────────────────────────────────────────────────────────

/// GET /v1/status
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceStatusResponse {
    pub status: DeviceStatus,
}

/// GET /v1/health
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}
