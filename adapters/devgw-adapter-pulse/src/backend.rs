//! Pulse backend implementation.

use async_trait::async_trait;
use ndarray::Array2;
use tracing::{debug, instrument};

use devgw_compile::{CircuitCompiler, GateSet};
use devgw_hal::mitigation::{self, AssignmentMatrix};
use devgw_hal::{
    Backend, BackendConfig, BackendFactory, Capabilities, CompiledCircuit, Counts, HalError,
    HalResult, QubitMapping, ReadoutCalibration,
};
use devgw_ir::Circuit;

use crate::compiler::{PulseCompiler, PulseProgram, VirtualZPolicy};
use crate::engine::{EmulatorConfig, EmulatorEngine, PulseEngine};

/// Widest dense confusion matrix the backend will build (4096 × 4096).
pub const MAX_CONFUSION_BITS: usize = 12;

/// Pulse-level backend over a [`PulseEngine`].
///
/// Requires readout calibration before its first job on an active device.
pub struct PulseBackend<E: PulseEngine = EmulatorEngine> {
    capabilities: Capabilities,
    compiler: PulseCompiler,
    engine: E,
}

impl<E: PulseEngine> PulseBackend<E> {
    pub fn new(engine: E) -> Self {
        let capabilities = Capabilities::hardware("pulse");
        Self {
            compiler: PulseCompiler::new(GateSet::from_capabilities(&capabilities)),
            capabilities,
            engine,
        }
    }

    pub fn with_policy(mut self, policy: VirtualZPolicy) -> Self {
        self.compiler = self.compiler.with_policy(policy);
        self
    }

    pub fn with_sampling_period(mut self, ns: f64) -> Self {
        self.compiler = self.compiler.with_sampling_period(ns);
        self
    }

    /// Restrict the qubits programs may use and calibration visits.
    pub fn with_exposed_qubits(mut self, labels: Vec<String>) -> Self {
        self.capabilities = self.capabilities.with_exposed_qubits(labels);
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn compiler(&self) -> &PulseCompiler {
        &self.compiler
    }
}

impl Default for PulseBackend<EmulatorEngine> {
    fn default() -> Self {
        Self::new(EmulatorEngine::default())
    }
}

#[async_trait]
impl<E: PulseEngine> Backend for PulseBackend<E> {
    type Program = PulseProgram;

    fn name(&self) -> &str {
        &self.capabilities.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn compile(&self, circuit: &Circuit, mapping: &QubitMapping) -> HalResult<CompiledCircuit<PulseProgram>> {
        let compiled = self.compiler.compile(circuit, mapping, &self.capabilities)?;
        debug!(schedule = %compiled.program.schedule, "pulse schedule");
        Ok(compiled)
    }

    async fn calibrate_qubit(&self, label: &str) -> HalResult<ReadoutCalibration> {
        self.engine.build_classifier(label).await
    }

    #[instrument(skip(self, compiled), fields(engine = self.engine.name()))]
    async fn execute(&self, compiled: &CompiledCircuit<PulseProgram>, shots: u32) -> HalResult<Counts> {
        self.engine.measure(&compiled.program, shots).await
    }

    fn inverse_confusion_matrix(&self, labels: &[Option<&str>]) -> HalResult<Array2<f64>> {
        if labels.len() > MAX_CONFUSION_BITS {
            return Err(HalError::ResourceLimit {
                requested: labels.len(),
                limit: MAX_CONFUSION_BITS,
            });
        }
        let matrices = labels
            .iter()
            .map(|label| match label {
                Some(label) => self.engine.assignment_matrix(label),
                None => Ok(IDENTITY),
            })
            .collect::<HalResult<Vec<_>>>()?;
        mitigation::joint_inverse(&matrices, MAX_CONFUSION_BITS)
    }
}

const IDENTITY: AssignmentMatrix = [[1.0, 0.0], [0.0, 1.0]];

impl BackendFactory for PulseBackend<EmulatorEngine> {
    /// Options: `sampling_period_ns`, `virtual_z_policy`, `exposed_qubits`,
    /// `seed`, and `emulator` (the readout error model).
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let mut emulator = config
            .parse_option::<EmulatorConfig>("emulator")?
            .unwrap_or_default();
        if let Some(seed) = config.parse_option::<u64>("seed")? {
            emulator.seed = Some(seed);
        }

        let mut backend = Self::new(EmulatorEngine::new(emulator));
        backend.capabilities.name = config.name.clone();

        if let Some(ns) = config.parse_option::<f64>("sampling_period_ns")? {
            if !(ns.is_finite() && ns > 0.0) {
                return Err(HalError::Configuration(format!(
                    "sampling_period_ns must be positive, got {ns}"
                )));
            }
            backend = backend.with_sampling_period(ns);
        }
        if let Some(policy) = config.parse_option::<VirtualZPolicy>("virtual_z_policy")? {
            backend = backend.with_policy(policy);
        }
        if let Some(labels) = config.parse_option::<Vec<String>>("exposed_qubits")? {
            backend = backend.with_exposed_qubits(labels);
        }
        Ok(backend)
    }
}
