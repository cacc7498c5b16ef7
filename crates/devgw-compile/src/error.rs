//! Error types for compilation.

use devgw_hal::HalError;
use thiserror::Error;

/// Errors that can occur while lowering a circuit for a backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompileError {
    /// The circuit uses an operation outside the backend's gate set.
    #[error("Unsupported instruction: {name}")]
    UnsupportedInstruction {
        /// Name of the operation.
        name: String,
    },

    /// A qubit outside the topology or the exposed set.
    #[error("Invalid qubit: {0}")]
    InvalidQubit(String),

    /// A two-qubit gate on an absent coupling.
    #[error("Invalid coupling: {control}-{target}")]
    InvalidCoupling {
        /// Label of the control qubit.
        control: String,
        /// Label of the target qubit.
        target: String,
    },

    /// A rotation angle that does not evaluate to a finite number.
    #[error("Unresolved parameter: {0}")]
    UnresolvedParameter(String),

    /// A duration the target cannot represent.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Error from the device model.
    #[error(transparent)]
    Hal(#[from] HalError),
}

impl From<CompileError> for HalError {
    fn from(e: CompileError) -> Self {
        match e {
            CompileError::UnsupportedInstruction { name } => HalError::UnsupportedInstruction { name },
            CompileError::InvalidQubit(q) => HalError::InvalidQubit(q),
            CompileError::InvalidCoupling { control, target } => {
                HalError::InvalidCoupling { control, target }
            }
            CompileError::Hal(e) => e,
            other => HalError::Program(other.to_string()),
        }
    }
}

/// Result type for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
