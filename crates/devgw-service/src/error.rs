//! Error types for the gateway service.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use devgw_hal::HalError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::rest::types::ErrorResponse;

/// Result type for service operations.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    /// The device status source reports INACTIVE.
    #[error("device is inactive")]
    DeviceInactive,

    /// The program failed to parse.
    #[error("QASM parsing error: {0}")]
    QasmParse(String),

    /// Device, compiler or backend error.
    #[error(transparent)]
    Backend(#[from] HalError),

    /// The request exceeded the configured job timeout.
    #[error("job timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Spawned work failed to complete.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::DeviceInactive => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::QasmParse(_) => StatusCode::BAD_REQUEST,
            ServiceError::Backend(e) => match e {
                HalError::UnsupportedInstruction { .. }
                | HalError::InvalidQubit(_)
                | HalError::InvalidCoupling { .. }
                | HalError::InvalidShots(_)
                | HalError::Program(_) => StatusCode::BAD_REQUEST,
                HalError::ResourceLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                HalError::BackendNotFound(_) | HalError::UnsupportedBackend(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Config(_) | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<devgw_qasm3::ParseError> for ServiceError {
    fn from(err: devgw_qasm3::ParseError) -> Self {
        ServiceError::QasmParse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ServiceError {
    fn from(err: tokio::task::JoinError) -> Self {
        ServiceError::Internal(format!("task failed: {err}"))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
                code: status.as_u16(),
            }),
        )
            .into_response()
    }
}
