//! Backend trait and configuration.
//!
//! A [`Backend`] pairs a compiler with an execution engine:
//!
//! ```text
//!   capabilities() ──→ compile() ──→ execute() ──→ raw Counts
//!    (sync, &ref)       (sync)        (async)
//!
//!   calibrate_qubit()        inverse_confusion_matrix()
//!   (async, once per qubit)  (sync, only for linear mitigation)
//! ```
//!
//! `compile` resolves virtual qubits through the [`QubitMapping`] and records
//! where every classical bit comes from; `execute` runs the lowered program
//! and reports bitstrings over the program's virtual qubits, qubit 0
//! rightmost. Remapping and mitigation happen outside the backend.

use async_trait::async_trait;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use devgw_ir::Circuit;

use crate::capability::Capabilities;
use crate::compiled::CompiledCircuit;
use crate::error::{HalError, HalResult};
use crate::mapping::QubitMapping;
use crate::result::Counts;

/// Configuration for a backend instance.
///
/// `name` selects the backend kind; everything else is passed through to
/// the backend's factory as `options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Kind name, e.g. `simulator` or `qubex`.
    pub name: String,
    /// Backend-specific options.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl BackendConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Map::new(),
        }
    }

    /// Add an option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    /// Deserialize the option `key` into `T`, if present.
    pub fn parse_option<T: serde::de::DeserializeOwned>(&self, key: &str) -> HalResult<Option<T>> {
        self.options
            .get(key)
            .map(|v| {
                serde_json::from_value(v.clone()).map_err(|e| {
                    HalError::Configuration(format!("option '{key}' for '{}': {e}", self.name))
                })
            })
            .transpose()
    }
}

/// Readout error rates measured for one qubit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadoutCalibration {
    /// P(measure 1 | prepared 0).
    pub prob_meas1_prep0: f64,
    /// P(measure 0 | prepared 1).
    pub prob_meas0_prep1: f64,
}

/// A compiler plus execution engine for one kind of device.
#[async_trait]
pub trait Backend: Send + Sync {
    /// The lowered program the engine consumes.
    type Program: Send + Sync;

    fn name(&self) -> &str;

    /// Capabilities, fixed at construction.
    fn capabilities(&self) -> &Capabilities;

    /// Lower a circuit for this backend.
    ///
    /// Fails with `UnsupportedInstruction` before producing anything if the
    /// circuit contains an operation outside the gate set, and with
    /// `InvalidQubit`/`InvalidCoupling` for resources the device lacks.
    fn compile(
        &self,
        circuit: &Circuit,
        mapping: &QubitMapping,
    ) -> HalResult<CompiledCircuit<Self::Program>>;

    /// Measure the readout error rates of the qubit with `label`.
    async fn calibrate_qubit(&self, label: &str) -> HalResult<ReadoutCalibration> {
        Err(HalError::Execution(format!(
            "backend '{}' cannot calibrate qubit {label}",
            self.name()
        )))
    }

    /// Run a compiled program for `shots` shots.
    async fn execute(
        &self,
        compiled: &CompiledCircuit<Self::Program>,
        shots: u32,
    ) -> HalResult<Counts>;

    /// Inverse joint confusion matrix over the measured qubits, bit 0 first.
    ///
    /// `None` marks a classical bit no measurement wrote; it contributes an
    /// identity factor.
    fn inverse_confusion_matrix(&self, labels: &[Option<&str>]) -> HalResult<Array2<f64>> {
        Err(HalError::Execution(format!(
            "backend '{}' provides no confusion matrix for {labels:?}",
            self.name()
        )))
    }
}

/// Construction from configuration, used by registry factories.
pub trait BackendFactory: Backend + Sized {
    fn from_config(config: BackendConfig) -> HalResult<Self>;
}
