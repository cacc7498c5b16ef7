//! Error types for the HAL crate.

use thiserror::Error;

/// Errors that can occur while compiling, calibrating, executing or
/// post-processing a job.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HalError {
    /// The program uses an operation the backend's gate set does not contain.
    #[error("Unsupported instruction: {name}")]
    UnsupportedInstruction {
        /// Name of the offending operation.
        name: String,
    },

    /// A virtual qubit does not resolve to an available physical qubit.
    #[error("Invalid qubit: {0}")]
    InvalidQubit(String),

    /// A two-qubit gate between qubits the device does not couple.
    #[error("Invalid coupling: {control}-{target}")]
    InvalidCoupling {
        /// Label of the control qubit.
        control: String,
        /// Label of the target qubit.
        target: String,
    },

    /// The device topology is malformed or inconsistent.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Post-processing would exceed the supported bit width.
    #[error("Resource limit exceeded: {requested} bits requested, limit is {limit}")]
    ResourceLimit {
        /// Number of bits requested.
        requested: usize,
        /// Maximum supported.
        limit: usize,
    },

    /// The execution engine failed.
    #[error("Execution error: {0}")]
    Execution(String),

    /// The engine produced output that is not a counts map.
    #[error("Result parse error: {0}")]
    ResultParse(String),

    /// No backend is registered under the name.
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// The name does not denote any supported backend kind.
    #[error("Backend '{0}' is not supported")]
    UnsupportedBackend(String),

    /// The submitted program could not be parsed.
    #[error("Invalid program: {0}")]
    Program(String),

    /// Invalid number of shots.
    #[error("Invalid shots: {0}")]
    InvalidShots(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HalError {
    /// Shorthand for [`HalError::UnsupportedInstruction`].
    pub fn unsupported_instruction(name: impl Into<String>) -> Self {
        HalError::UnsupportedInstruction { name: name.into() }
    }
}

/// Result type for HAL operations.
pub type HalResult<T> = Result<T, HalError>;
