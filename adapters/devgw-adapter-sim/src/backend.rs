//! Simulator backend implementation.

use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Instant;
use tracing::{debug, instrument};

use devgw_compile::{CircuitCompiler, GateSet};
use devgw_hal::{
    Backend, BackendConfig, BackendFactory, Capabilities, CompiledCircuit, Counts, HalError,
    HalResult, QubitMapping,
};
use devgw_ir::Circuit;

use crate::compiler::SimCompiler;
use crate::statevector::{SimOp, Statevector};

/// Ideal state-vector simulator.
///
/// Needs no calibration. Measurements are taken at the end of the circuit:
/// the final state is sampled `shots` times.
pub struct SimulatorBackend {
    capabilities: Capabilities,
    compiler: SimCompiler,
    seed: Option<u64>,
}

impl SimulatorBackend {
    /// A simulator with the standard gate set and fresh entropy per job.
    pub fn new() -> Self {
        let capabilities = Capabilities::simulator("simulator");
        Self {
            compiler: SimCompiler::new(GateSet::from_capabilities(&capabilities)),
            capabilities,
            seed: None,
        }
    }

    /// Sample every job from the same seeded generator state.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Restrict the qubits programs may use.
    pub fn with_exposed_qubits(mut self, labels: Vec<String>) -> Self {
        self.capabilities = self.capabilities.with_exposed_qubits(labels);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for SimulatorBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Simulate and sample synchronously.
fn run_simulation(ops: &[SimOp], num_qubits: usize, shots: u32, mut rng: StdRng) -> HalResult<Counts> {
    let start = Instant::now();
    let mut sv = Statevector::new(num_qubits)?;
    sv.run(ops)?;
    let counts = sv.sample_counts(shots, &mut rng)?;
    debug!(num_qubits, shots, elapsed = ?start.elapsed(), "simulation completed");
    Ok(counts)
}

#[async_trait]
impl Backend for SimulatorBackend {
    type Program = Vec<SimOp>;

    fn name(&self) -> &str {
        &self.capabilities.name
    }

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn compile(
        &self,
        circuit: &Circuit,
        mapping: &QubitMapping,
    ) -> HalResult<CompiledCircuit<Vec<SimOp>>> {
        Ok(self.compiler.compile(circuit, mapping, &self.capabilities)?)
    }

    #[instrument(skip(self, compiled), fields(ops = compiled.program.len()))]
    async fn execute(&self, compiled: &CompiledCircuit<Vec<SimOp>>, shots: u32) -> HalResult<Counts> {
        let ops = compiled.program.clone();
        let num_qubits = compiled.num_qubits;
        let rng = self.rng();

        tokio::task::spawn_blocking(move || run_simulation(&ops, num_qubits, shots, rng))
            .await
            .map_err(|e| HalError::Execution(format!("simulation task failed: {e}")))?
    }
}

impl BackendFactory for SimulatorBackend {
    fn from_config(config: BackendConfig) -> HalResult<Self> {
        let mut backend = Self::new();
        backend.capabilities.name = config.name.clone();
        if let Some(seed) = config.parse_option::<u64>("seed")? {
            backend = backend.with_seed(seed);
        }
        if let Some(labels) = config.parse_option::<Vec<String>>("exposed_qubits")? {
            backend = backend.with_exposed_qubits(labels);
        }
        Ok(backend)
    }
}
